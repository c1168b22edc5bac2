//! Core behaviors shared by the HTTP handlers.
//!
//! This includes:
//!   - The practice-event cascade (streak -> achievements -> challenges -> xp)
//!   - Student initialization (level state + first weekly challenges)
//!   - Read operations (level info, achievement/challenge lists, dashboard)
//!   - Suggestions, leaderboard and task management
//!
//! Everything mutating one student runs under that student's record lock;
//! see `state.rs` for the concurrency model.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::challenges::{generate_weekly, update_challenges};
use crate::domain::{
  AchievementCategory, ChallengeStatus, PracticeEvent, PracticeTask, StudentLevelState,
  WeeklyChallenge,
};
use crate::error::{GamifyError, Result};
use crate::progress::evaluate_achievements;
use crate::protocol::*;
use crate::state::{AppState, StudentRecord};
use crate::util::{week_end_of, week_start_of};

/// Weekly regularity goal used by stats and motivation messages.
const TARGET_PRACTICE_DAYS_PER_WEEK: u32 = 5;

fn validate(input: &PracticeIn) -> Result<()> {
  if input.student.trim().is_empty() {
    return Err(GamifyError::Validation("student must not be empty".into()));
  }
  if input.minutes == 0 {
    return Err(GamifyError::Validation("minutes must be positive".into()));
  }
  if !(1..=5).contains(&input.rating) {
    return Err(GamifyError::Validation("rating must be between 1 and 5".into()));
  }
  Ok(())
}

/// Record one practice event and run the full gamification cascade.
#[instrument(level = "info", skip(state, input), fields(student = %input.student, minutes = input.minutes))]
pub async fn record_practice_event(state: &AppState, input: PracticeIn) -> Result<PracticeOut> {
  let now = Utc::now();
  record_practice_event_at(state, input, now.date_naive(), now).await
}

/// Cascade with an explicit clock, so tests can pin "today".
pub async fn record_practice_event_at(
  state: &AppState,
  input: PracticeIn,
  today: NaiveDate,
  now: DateTime<Utc>,
) -> Result<PracticeOut> {
  validate(&input)?;

  let event = PracticeEvent {
    student: input.student.clone(),
    date: input.date,
    minutes: input.minutes,
    rating: input.rating,
    focus: input.focus,
    piece: input.piece,
    note: input.note,
  };

  let rec = state.student(&input.student).await;
  let mut rec = rec.lock().await;
  let rec = &mut *rec;

  let level = rec.level.get_or_insert_with(StudentLevelState::new);

  // 1. Streak transition first: consecutive-days badges read streak state.
  level.update_streak(event.date);
  rec.events.push(event.clone());

  // 2. Achievement pass; rewards land immediately.
  let newly_earned = evaluate_achievements(
    &state.catalog,
    &rec.events,
    level,
    &mut rec.achievements,
    today,
    now,
  );
  for def in &newly_earned {
    level.add_experience(def.points);
  }

  // 3. Weekly challenge pass; completions pay reward + bonus.
  let completed = update_challenges(&mut rec.challenges, &rec.events, today, now);
  let mut completed_kinds = Vec::with_capacity(completed.len());
  for (kind, points) in completed {
    level.add_experience(points);
    completed_kinds.push(kind);
  }

  // 4. Lifetime practice-time counter.
  level.total_practice_time += event.minutes as u64;

  info!(
    target: "gamify_backend",
    student = %event.student,
    earned = newly_earned.len(),
    completed = completed_kinds.len(),
    "Practice event processed"
  );

  let newly_earned_out = newly_earned
    .iter()
    .map(|def| {
      let p = &rec.achievements[&def.name];
      achievement_out(def, p)
    })
    .collect();

  Ok(PracticeOut {
    newly_earned: newly_earned_out,
    completed_challenges: completed_kinds,
    level: level_info_out(level),
  })
}

/// Create the student's level state, generate this week's challenges and
/// run one achievement pass. Safe to call repeatedly.
#[instrument(level = "info", skip(state))]
pub async fn initialize_student(state: &AppState, student: &str) -> Result<InitOut> {
  let now = Utc::now();
  use rand::SeedableRng;
  let mut rng = rand::rngs::StdRng::from_entropy();
  initialize_student_at(state, student, &mut rng, now.date_naive(), now).await
}

pub async fn initialize_student_at<R: Rng>(
  state: &AppState,
  student: &str,
  rng: &mut R,
  today: NaiveDate,
  now: DateTime<Utc>,
) -> Result<InitOut> {
  if student.trim().is_empty() {
    return Err(GamifyError::Validation("student must not be empty".into()));
  }

  let rec = state.student(student).await;
  let mut rec = rec.lock().await;
  let rec = &mut *rec;

  let level = rec.level.get_or_insert_with(StudentLevelState::new);

  let week_start = week_start_of(today);
  let challenges = generate_weekly(rng, student, &rec.events, &mut rec.challenges, week_start, today);

  let newly_earned = evaluate_achievements(
    &state.catalog,
    &rec.events,
    level,
    &mut rec.achievements,
    today,
    now,
  );
  for def in &newly_earned {
    level.add_experience(def.points);
  }

  let newly_earned_out = newly_earned
    .iter()
    .map(|def| achievement_out(def, &rec.achievements[&def.name]))
    .collect();

  Ok(InitOut {
    level: level_info_out(level),
    challenges: challenges.iter().map(challenge_out).collect(),
    newly_earned: newly_earned_out,
  })
}

/// Level info for one student, or `NotInitialized` for a fresh one.
pub async fn get_level_info(state: &AppState, student: &str) -> Result<LevelInfoOut> {
  let rec = state
    .student_if_exists(student)
    .await
    .ok_or(GamifyError::NotInitialized)?;
  let rec = rec.lock().await;
  rec.level
    .as_ref()
    .map(level_info_out)
    .ok_or(GamifyError::NotInitialized)
}

/// Achievement list, most recently earned first, then by progress.
pub async fn get_achievements(
  state: &AppState,
  student: &str,
  category: Option<AchievementCategory>,
  earned_only: bool,
) -> Vec<AchievementOut> {
  let Some(rec) = state.student_if_exists(student).await else {
    return Vec::new();
  };
  let rec = rec.lock().await;

  let mut out: Vec<AchievementOut> = rec
    .achievements
    .iter()
    .filter_map(|(name, p)| state.catalog.get(name).map(|def| achievement_out(def, p)))
    .filter(|a| category.map_or(true, |c| a.category == c))
    .filter(|a| !earned_only || a.is_earned)
    .collect();

  out.sort_by(|a, b| {
    b.earned_at
      .cmp(&a.earned_at)
      .then(b.progress.partial_cmp(&a.progress).unwrap_or(std::cmp::Ordering::Equal))
  });
  out
}

/// Challenge list with optional week / status filters, newest week first.
pub async fn get_challenges(
  state: &AppState,
  student: &str,
  week_start: Option<NaiveDate>,
  status: Option<ChallengeStatus>,
) -> Vec<ChallengeOut> {
  let Some(rec) = state.student_if_exists(student).await else {
    return Vec::new();
  };
  let rec = rec.lock().await;

  let mut list: Vec<&WeeklyChallenge> = rec
    .challenges
    .values()
    .filter(|c| week_start.map_or(true, |w| c.week_start == w))
    .filter(|c| status.map_or(true, |s| c.status == s))
    .collect();
  list.sort_by(|a, b| b.week_start.cmp(&a.week_start));
  list.into_iter().map(challenge_out).collect()
}

pub async fn challenge_statistics(state: &AppState, student: &str) -> ChallengeStatsOut {
  let Some(rec) = state.student_if_exists(student).await else {
    return ChallengeStatsOut { total: 0, completed: 0, active: 0, points_earned: 0, completion_rate: 0.0 };
  };
  let rec = rec.lock().await;

  let total = rec.challenges.len();
  let completed = rec
    .challenges
    .values()
    .filter(|c| c.status == ChallengeStatus::Completed)
    .count();
  let active = rec
    .challenges
    .values()
    .filter(|c| c.status == ChallengeStatus::Active)
    .count();
  let points_earned: u64 = rec
    .challenges
    .values()
    .filter(|c| c.status == ChallengeStatus::Completed)
    .map(|c| c.total_points() as u64)
    .sum();
  let completion_rate = if total > 0 {
    completed as f64 / total as f64 * 100.0
  } else {
    0.0
  };

  ChallengeStatsOut { total, completed, active, points_earned, completion_rate }
}

/// Ranked list of at most three actionable nudges.
pub async fn suggest_next_actions(state: &AppState, student: &str) -> Vec<SuggestionOut> {
  suggest_next_actions_at(state, student, Utc::now().date_naive()).await
}

pub async fn suggest_next_actions_at(
  state: &AppState,
  student: &str,
  today: NaiveDate,
) -> Vec<SuggestionOut> {
  let Some(rec) = state.student_if_exists(student).await else {
    return vec![getting_started_nudge()];
  };
  let rec = rec.lock().await;
  let mut suggestions = Vec::new();

  // Overdue tasks first: the most urgent thing a student can act on.
  let overdue = rec.tasks.iter().filter(|t| t.is_overdue(today)).count();
  if overdue > 0 {
    suggestions.push(SuggestionOut {
      kind: "urgent_task".into(),
      message: format!("You have {overdue} overdue task(s) to finish"),
      action: "complete_tasks".into(),
      priority: SuggestionPriority::High,
    });
  }

  // Current-week challenges that are both behind and close to the deadline.
  let week_start = week_start_of(today);
  for c in rec.challenges.values() {
    if c.status == ChallengeStatus::Active
      && c.week_start == week_start
      && c.progress_percentage() < 50.0
      && c.days_remaining(today) <= 2
    {
      suggestions.push(SuggestionOut {
        kind: "challenge_reminder".into(),
        message: format!(
          "Challenge \"{}\" closes in {} day(s)",
          c.title,
          c.days_remaining(today)
        ),
        action: "practice_now".into(),
        priority: SuggestionPriority::Medium,
      });
    }
  }

  // Low practice frequency this week.
  let week = week_stats(&rec, today);
  if week.practice_days < 3 && week.days_remaining > 0 {
    suggestions.push(SuggestionOut {
      kind: "practice_reminder".into(),
      message: "Few practice days logged this week; try to practice today".into(),
      action: "practice_today".into(),
      priority: SuggestionPriority::Medium,
    });
  }

  // No recorded activity at all.
  if rec.events.is_empty() {
    suggestions.push(getting_started_nudge());
  }

  suggestions.truncate(3);
  suggestions
}

fn getting_started_nudge() -> SuggestionOut {
  SuggestionOut {
    kind: "getting_started".into(),
    message: "Log your first practice session to start earning achievements".into(),
    action: "log_practice".into(),
    priority: SuggestionPriority::Low,
  }
}

fn week_stats(rec: &StudentRecord, today: NaiveDate) -> WeekStatsOut {
  let week_start = week_start_of(today);
  let week_end = week_end_of(week_start);
  let events: Vec<&PracticeEvent> = rec
    .events
    .iter()
    .filter(|e| e.date >= week_start && e.date <= week_end.min(today))
    .collect();

  let total_minutes: u64 = events.iter().map(|e| e.minutes as u64).sum();
  let avg_rating = if events.is_empty() {
    0.0
  } else {
    let sum: u64 = events.iter().map(|e| e.rating as u64).sum();
    (sum as f64 / events.len() as f64 * 100.0).round() / 100.0
  };
  let mut days: Vec<NaiveDate> = events.iter().map(|e| e.date).collect();
  days.sort();
  days.dedup();

  WeekStatsOut {
    total_minutes,
    total_sessions: events.len(),
    avg_rating,
    practice_days: days.len(),
    target_days: TARGET_PRACTICE_DAYS_PER_WEEK,
    days_remaining: ((week_end - today).num_days() + 1).max(0),
  }
}

fn motivation_message(level: Option<&StudentLevelState>, week: &WeekStatsOut) -> String {
  let Some(level) = level else {
    return "Welcome! Log a practice session to begin your journey.".into();
  };

  let mut messages: Vec<String> = Vec::new();

  if level.level < 5 {
    messages.push("You are building a solid practice habit, keep going!".into());
  } else if level.level < 10 {
    messages.push("Steady progress; your skills keep improving!".into());
  } else {
    messages.push("You are a seasoned practicer by now!".into());
  }

  if week.practice_days >= 5 {
    messages.push("Your practice this week has been wonderfully regular!".into());
  } else if week.practice_days >= 3 {
    messages.push("Good week so far; push for the 5-day goal!".into());
  } else if week.practice_days > 0 {
    messages.push("A little every day adds up. Keep at it!".into());
  } else {
    messages.push("A new week has started; time to pick up the instrument!".into());
  }

  if level.current_streak >= 7 {
    messages.push(format!("{} days in a row; remarkable persistence!", level.current_streak));
  } else if level.current_streak >= 3 {
    messages.push(format!("{} days in a row; a habit is forming!", level.current_streak));
  }

  messages.truncate(2);
  messages.join(" ")
}

/// Composite read model for the presentation layer.
pub async fn get_dashboard(state: &AppState, student: &str) -> DashboardOut {
  get_dashboard_at(state, student, Utc::now()).await
}

pub async fn get_dashboard_at(state: &AppState, student: &str, now: DateTime<Utc>) -> DashboardOut {
  let today = now.date_naive();
  let week_start = week_start_of(today);

  let Some(rec) = state.student_if_exists(student).await else {
    return DashboardOut {
      student: student.into(),
      initialized: false,
      level: None,
      recent_achievements: Vec::new(),
      current_challenges: Vec::new(),
      pending_tasks: Vec::new(),
      week_stats: WeekStatsOut {
        total_minutes: 0,
        total_sessions: 0,
        avg_rating: 0.0,
        practice_days: 0,
        target_days: TARGET_PRACTICE_DAYS_PER_WEEK,
        days_remaining: ((week_end_of(week_start) - today).num_days() + 1).max(0),
      },
      challenge_stats: ChallengeStatsOut {
        total: 0,
        completed: 0,
        active: 0,
        points_earned: 0,
        completion_rate: 0.0,
      },
      motivation: motivation_message(None, &WeekStatsOut {
        total_minutes: 0,
        total_sessions: 0,
        avg_rating: 0.0,
        practice_days: 0,
        target_days: TARGET_PRACTICE_DAYS_PER_WEEK,
        days_remaining: 0,
      }),
    };
  };

  let rec_guard = rec.lock().await;
  let rec = &*rec_guard;

  let cutoff = now - Duration::days(7);
  let mut recent: Vec<AchievementOut> = rec
    .achievements
    .iter()
    .filter(|(_, p)| p.is_earned && p.earned_at.map_or(false, |at| at >= cutoff))
    .filter_map(|(name, p)| state.catalog.get(name).map(|def| achievement_out(def, p)))
    .collect();
  recent.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));

  let mut current: Vec<&WeeklyChallenge> = rec
    .challenges
    .values()
    .filter(|c| c.week_start == week_start && c.status == ChallengeStatus::Active)
    .collect();
  current.sort_by_key(|c| c.title.clone());

  let mut pending: Vec<&PracticeTask> = rec.tasks.iter().filter(|t| !t.is_completed).collect();
  pending.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.due_date.cmp(&b.due_date)));
  pending.truncate(5);

  let week = week_stats(rec, today);
  let motivation = motivation_message(rec.level.as_ref(), &week);

  let total = rec.challenges.len();
  let completed = rec.challenges.values().filter(|c| c.status == ChallengeStatus::Completed).count();
  let challenge_stats = ChallengeStatsOut {
    total,
    completed,
    active: rec.challenges.values().filter(|c| c.status == ChallengeStatus::Active).count(),
    points_earned: rec
      .challenges
      .values()
      .filter(|c| c.status == ChallengeStatus::Completed)
      .map(|c| c.total_points() as u64)
      .sum(),
    completion_rate: if total > 0 { completed as f64 / total as f64 * 100.0 } else { 0.0 },
  };

  DashboardOut {
    student: student.into(),
    initialized: rec.level.is_some(),
    level: rec.level.as_ref().map(level_info_out),
    recent_achievements: recent,
    current_challenges: current.into_iter().map(challenge_out).collect(),
    pending_tasks: pending.into_iter().map(|t| task_out(t, today)).collect(),
    week_stats: week,
    challenge_stats,
    motivation,
  }
}

/// Top students by (level, total points), with 30-day activity aggregates.
pub async fn leaderboard(state: &AppState, limit: usize) -> Vec<LeaderboardEntryOut> {
  leaderboard_at(state, limit, Utc::now().date_naive()).await
}

pub async fn leaderboard_at(
  state: &AppState,
  limit: usize,
  today: NaiveDate,
) -> Vec<LeaderboardEntryOut> {
  let cutoff = today - Duration::days(30);
  let mut rows = Vec::new();

  for (name, rec) in state.all_students().await {
    let rec = rec.lock().await;
    let Some(level) = rec.level.as_ref() else { continue };

    let recent: Vec<&PracticeEvent> = rec.events.iter().filter(|e| e.date >= cutoff).collect();
    let recent_minutes: u64 = recent.iter().map(|e| e.minutes as u64).sum();
    let recent_avg_rating = if recent.is_empty() {
      0.0
    } else {
      let sum: u64 = recent.iter().map(|e| e.rating as u64).sum();
      (sum as f64 / recent.len() as f64 * 100.0).round() / 100.0
    };

    rows.push(LeaderboardEntryOut {
      rank: 0,
      student: name,
      level: level.level,
      title: level.title.clone(),
      total_points: level.total_points,
      current_streak: level.current_streak,
      longest_streak: level.longest_streak,
      recent_minutes,
      recent_avg_rating,
    });
  }

  rows.sort_by(|a, b| b.level.cmp(&a.level).then(b.total_points.cmp(&a.total_points)));
  rows.truncate(limit);
  for (i, row) in rows.iter_mut().enumerate() {
    row.rank = i + 1;
  }
  rows
}

/// Create an assigned practice task.
#[instrument(level = "info", skip(state, input), fields(student = %input.student, title = %input.title))]
pub async fn create_task(state: &AppState, input: TaskIn) -> Result<TaskOut> {
  if input.student.trim().is_empty() || input.title.trim().is_empty() {
    return Err(GamifyError::Validation("student and title must not be empty".into()));
  }
  if input.points_reward == 0 {
    return Err(GamifyError::Validation("task reward must be positive".into()));
  }

  let task = PracticeTask {
    id: Uuid::new_v4().to_string(),
    student: input.student.clone(),
    title: input.title,
    description: input.description,
    due_date: input.due_date,
    priority: input.priority,
    points_reward: input.points_reward,
    is_completed: false,
    completed_at: None,
    completion_notes: String::new(),
  };

  let rec = state.student(&input.student).await;
  let mut rec = rec.lock().await;
  rec.tasks.push(task.clone());
  Ok(task_out(&task, Utc::now().date_naive()))
}

/// Mark a task completed and award its points. Completing twice is a no-op
/// for points.
#[instrument(level = "info", skip(state, input), fields(student = %input.student, task = %input.task_id))]
pub async fn complete_task(state: &AppState, input: TaskCompleteIn) -> Result<TaskOut> {
  let now = Utc::now();
  let today = now.date_naive();

  let rec = state
    .student_if_exists(&input.student)
    .await
    .ok_or_else(|| GamifyError::Validation(format!("unknown task: {}", input.task_id)))?;
  let mut rec = rec.lock().await;
  let rec = &mut *rec;

  let task = rec
    .tasks
    .iter_mut()
    .find(|t| t.id == input.task_id)
    .ok_or_else(|| GamifyError::Validation(format!("unknown task: {}", input.task_id)))?;

  if !task.is_completed {
    task.is_completed = true;
    task.completed_at = Some(now);
    task.completion_notes = input.notes;

    let level = rec.level.get_or_insert_with(StudentLevelState::new);
    level.add_experience(task.points_reward);
    info!(target: "gamify_backend", task = %task.title, points = task.points_reward, "Task completed");
  }

  Ok(task_out(task, today))
}

/// Task list with an optional status filter.
pub async fn get_tasks(
  state: &AppState,
  student: &str,
  status: Option<TaskStatusFilter>,
) -> Vec<TaskOut> {
  let today = Utc::now().date_naive();
  let Some(rec) = state.student_if_exists(student).await else {
    return Vec::new();
  };
  let rec = rec.lock().await;

  let mut tasks: Vec<&PracticeTask> = rec
    .tasks
    .iter()
    .filter(|t| match status {
      None => true,
      Some(TaskStatusFilter::Active) => !t.is_completed,
      Some(TaskStatusFilter::Completed) => t.is_completed,
      Some(TaskStatusFilter::Overdue) => t.is_overdue(today),
    })
    .collect();
  tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.due_date.cmp(&b.due_date)));
  tasks.into_iter().map(|t| task_out(t, today)).collect()
}
