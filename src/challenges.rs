//! Weekly challenges: personalized generation from the template table and
//! the weekly progress/completion/expiry state machine.
//!
//! Generation is idempotent per (student, week_start). Updating recomputes
//! progress for the current week's active challenges from this week's events
//! only; Completed and Expired are terminal.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::catalog::{ChallengeTemplate, CHALLENGE_TEMPLATES};
use crate::domain::{
  ChallengeKind, ChallengeStatus, Difficulty, FocusArea, PracticeEvent, WeeklyChallenge,
};
use crate::util::{fill_template, fmt_target, week_end_of, week_start_of};

/// Aggregate recent-performance stats driving personalization.
#[derive(Clone, Debug)]
pub struct StudentStats {
  pub avg_daily_minutes: f64,
  pub total_sessions: usize,
  pub avg_rating: f64,
}

const LOOKBACK_DAYS: i64 = 30;

/// 30-day lookback aggregates, with the defaults a brand-new student gets.
pub fn lookback_stats(events: &[PracticeEvent], today: NaiveDate) -> StudentStats {
  let cutoff = today - Duration::days(LOOKBACK_DAYS);
  let recent: Vec<&PracticeEvent> = events.iter().filter(|e| e.date >= cutoff).collect();

  if recent.is_empty() {
    return StudentStats { avg_daily_minutes: 30.0, total_sessions: 0, avg_rating: 3.0 };
  }

  let minutes: u64 = recent.iter().map(|e| e.minutes as u64).sum();
  let ratings: u64 = recent.iter().map(|e| e.rating as u64).sum();

  StudentStats {
    avg_daily_minutes: minutes as f64 / recent.len() as f64,
    total_sessions: recent.len(),
    avg_rating: ratings as f64 / recent.len() as f64,
  }
}

/// Tier classification: new students get easy targets, consistently
/// high-rated students get hard ones.
pub fn classify_difficulty(stats: &StudentStats) -> Difficulty {
  if stats.total_sessions < 10 {
    Difficulty::Easy
  } else if stats.avg_rating > 4.0 {
    Difficulty::Hard
  } else {
    Difficulty::Medium
  }
}

/// Generate this week's challenges for a student. If any already exist for
/// `week_start`, they are returned unchanged and nothing new is created.
pub fn generate_weekly<R: Rng>(
  rng: &mut R,
  student: &str,
  events: &[PracticeEvent],
  challenges: &mut HashMap<(NaiveDate, ChallengeKind), WeeklyChallenge>,
  week_start: NaiveDate,
  today: NaiveDate,
) -> Vec<WeeklyChallenge> {
  let existing: Vec<WeeklyChallenge> = challenges
    .values()
    .filter(|c| c.week_start == week_start)
    .cloned()
    .collect();
  if !existing.is_empty() {
    info!(target: "challenge", %student, %week_start, count = existing.len(), "Challenges already generated for this week");
    return existing;
  }

  let stats = lookback_stats(events, today);
  let difficulty = classify_difficulty(&stats);

  let count = rng.gen_range(3..=4usize);
  let mut generated = Vec::with_capacity(count);
  for template in CHALLENGE_TEMPLATES.choose_multiple(rng, count) {
    let c = instantiate(template, &stats, difficulty, student, week_start);
    info!(target: "challenge", %student, kind = ?c.kind, target = c.target, ?difficulty, "Created weekly challenge");
    challenges.insert((week_start, c.kind), c.clone());
    generated.push(c);
  }
  generated
}

/// Turn one template into a concrete challenge, scaling the target off the
/// student's own recent performance where that makes sense.
fn instantiate(
  template: &ChallengeTemplate,
  stats: &StudentStats,
  difficulty: Difficulty,
  student: &str,
  week_start: NaiveDate,
) -> WeeklyChallenge {
  let multiplier = template.multiplier(difficulty);

  let target = match template.kind {
    ChallengeKind::PracticeTime => {
      // Scale off the student's own weekly volume, never below the base.
      let avg_weekly = stats.avg_daily_minutes * 7.0;
      (avg_weekly * multiplier).max(template.base_target)
    }
    ChallengeKind::RatingImprovement => {
      // Nudge from the current average towards the base rating target.
      let current = stats.avg_rating;
      (current + (template.base_target - current) * multiplier).min(5.0)
    }
    // Day and piece counts only make sense as whole numbers.
    ChallengeKind::ConsecutiveDays | ChallengeKind::VarietyPractice => {
      (template.base_target * multiplier).round().max(1.0)
    }
    ChallengeKind::SkillFocus => template.base_target * multiplier,
  };

  // The SkillFocus metric always counts technique minutes, so the text
  // must name technique too.
  let description = fill_template(
    template.description,
    &[
      ("target", fmt_target(target).as_str()),
      ("focus", FocusArea::Technique.display_name()),
    ],
  );

  WeeklyChallenge {
    student: student.into(),
    week_start,
    kind: template.kind,
    title: template.title.into(),
    description,
    target,
    current_progress: 0.0,
    difficulty,
    points_reward: (template.base_points as f64 * multiplier) as u32,
    bonus_points: 0,
    status: ChallengeStatus::Active,
    completed_at: None,
  }
}

/// Recompute every active challenge. Current-week challenges get fresh
/// progress from this week's events and may complete; past-week actives
/// expire. Returns (kind, total reward) for each completion so the caller
/// can route points to the level tracker exactly once.
pub fn update_challenges(
  challenges: &mut HashMap<(NaiveDate, ChallengeKind), WeeklyChallenge>,
  events: &[PracticeEvent],
  today: NaiveDate,
  now: DateTime<Utc>,
) -> Vec<(ChallengeKind, u32)> {
  let current_week = week_start_of(today);
  let mut rewards = Vec::new();

  for c in challenges.values_mut() {
    if c.status != ChallengeStatus::Active {
      continue;
    }

    if c.week_end() < today {
      c.status = ChallengeStatus::Expired;
      info!(target: "challenge", student = %c.student, kind = ?c.kind, week_start = %c.week_start, "Challenge expired");
      continue;
    }

    if c.week_start != current_week {
      continue;
    }

    if c.target <= 0.0 {
      warn!(target: "challenge", student = %c.student, kind = ?c.kind, target = c.target, "Skipping challenge with non-positive target");
      continue;
    }

    c.current_progress = weekly_progress(c.kind, events, c.week_start, today);

    if c.current_progress >= c.target {
      complete(c, today, now);
      rewards.push((c.kind, c.total_points()));
    }
  }

  rewards
}

fn complete(c: &mut WeeklyChallenge, today: NaiveDate, now: DateTime<Utc>) {
  c.status = ChallengeStatus::Completed;
  c.completed_at = Some(now);

  // Overachievement: half the reward, scaled by how far past the target.
  if c.current_progress > c.target {
    let excess = (c.current_progress - c.target) / c.target;
    c.bonus_points = (c.points_reward as f64 * 0.5 * excess).floor() as u32;
  }
  // Early completion: 5 points per day left in the week.
  c.bonus_points += (c.days_remaining(today) * 5) as u32;

  info!(target: "challenge", student = %c.student, kind = ?c.kind, reward = c.points_reward, bonus = c.bonus_points, "Challenge completed");
}

/// Progress for one challenge kind over this week's events only.
fn weekly_progress(
  kind: ChallengeKind,
  events: &[PracticeEvent],
  week_start: NaiveDate,
  today: NaiveDate,
) -> f64 {
  let week_end = week_end_of(week_start);
  let week_events: Vec<&PracticeEvent> = events
    .iter()
    .filter(|e| e.date >= week_start && e.date <= week_end)
    .collect();

  match kind {
    ChallengeKind::PracticeTime => {
      week_events.iter().map(|e| e.minutes as u64).sum::<u64>() as f64
    }
    ChallengeKind::ConsecutiveDays => {
      longest_daily_run(&week_events, week_start, week_end.min(today)) as f64
    }
    ChallengeKind::RatingImprovement => {
      if week_events.is_empty() {
        0.0
      } else {
        let sum: u64 = week_events.iter().map(|e| e.rating as u64).sum();
        sum as f64 / week_events.len() as f64
      }
    }
    ChallengeKind::SkillFocus => week_events
      .iter()
      .filter(|e| e.focus == FocusArea::Technique)
      .map(|e| e.minutes as u64)
      .sum::<u64>() as f64,
    ChallengeKind::VarietyPractice => {
      let pieces: HashSet<&str> = week_events
        .iter()
        .map(|e| e.piece.as_str())
        .filter(|p| !p.is_empty())
        .collect();
      pieces.len() as f64
    }
  }
}

/// Longest run of consecutive practiced days within [from, to].
fn longest_daily_run(week_events: &[&PracticeEvent], from: NaiveDate, to: NaiveDate) -> u32 {
  let practiced: HashSet<NaiveDate> = week_events.iter().map(|e| e.date).collect();
  let mut best = 0u32;
  let mut run = 0u32;
  let mut day = from;
  while day <= to {
    if practiced.contains(&day) {
      run += 1;
      best = best.max(run);
    } else {
      run = 0;
    }
    day += Duration::days(1);
  }
  best
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
  }

  // Monday 2024-06-03.
  fn ws() -> NaiveDate {
    d(3)
  }

  fn event(day: u32, minutes: u32, rating: u8, focus: FocusArea, piece: &str) -> PracticeEvent {
    PracticeEvent {
      student: "ada".into(),
      date: d(day),
      minutes,
      rating,
      focus,
      piece: piece.into(),
      note: String::new(),
    }
  }

  fn base_challenge(kind: ChallengeKind, target: f64, reward: u32) -> WeeklyChallenge {
    WeeklyChallenge {
      student: "ada".into(),
      week_start: ws(),
      kind,
      title: String::new(),
      description: String::new(),
      target,
      current_progress: 0.0,
      difficulty: Difficulty::Medium,
      points_reward: reward,
      bonus_points: 0,
      status: ChallengeStatus::Active,
      completed_at: None,
    }
  }

  #[test]
  fn fresh_student_gets_easy_tier() {
    let stats = lookback_stats(&[], d(3));
    assert_eq!(stats.total_sessions, 0);
    assert_eq!(stats.avg_daily_minutes, 30.0);
    assert_eq!(classify_difficulty(&stats), Difficulty::Easy);
  }

  #[test]
  fn high_rated_regulars_get_hard_tier() {
    let events: Vec<_> = (1..=12)
      .map(|day| event(day, 45, 5, FocusArea::Technique, "etude"))
      .collect();
    let stats = lookback_stats(&events, d(12));
    assert_eq!(classify_difficulty(&stats), Difficulty::Hard);
  }

  #[test]
  fn session_count_outranks_rating_for_tiering() {
    let events: Vec<_> = (1..=5)
      .map(|day| event(day, 45, 5, FocusArea::Technique, "etude"))
      .collect();
    let stats = lookback_stats(&events, d(5));
    assert_eq!(classify_difficulty(&stats), Difficulty::Easy);
  }

  #[test]
  fn generation_invariants_hold_for_any_seed() {
    for seed in 0..20 {
      let mut rng = StdRng::seed_from_u64(seed);
      let mut store = HashMap::new();
      let out = generate_weekly(&mut rng, "ada", &[], &mut store, ws(), d(3));

      assert!((3..=4).contains(&out.len()), "seed {seed}: {} challenges", out.len());
      let kinds: HashSet<_> = out.iter().map(|c| c.kind).collect();
      assert_eq!(kinds.len(), out.len(), "seed {seed}: duplicate kinds");
      for c in &out {
        assert!(c.target > 0.0);
        assert!(c.points_reward > 0);
        assert_eq!(c.status, ChallengeStatus::Active);
        assert_eq!(c.difficulty, Difficulty::Easy);
        assert!(!c.description.contains('{'), "unfilled template: {}", c.description);
      }
    }
  }

  #[test]
  fn generation_is_idempotent_per_week() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = HashMap::new();
    let first = generate_weekly(&mut rng, "ada", &[], &mut store, ws(), d(3));
    let again = generate_weekly(&mut rng, "ada", &[], &mut store, ws(), d(4));
    assert_eq!(store.len(), first.len());
    assert_eq!(again.len(), first.len());
    let mut a: Vec<_> = first.iter().map(|c| c.kind).collect();
    let mut b: Vec<_> = again.iter().map(|c| c.kind).collect();
    a.sort_by_key(|k| format!("{k:?}"));
    b.sort_by_key(|k| format!("{k:?}"));
    assert_eq!(a, b);
  }

  #[test]
  fn practice_time_target_never_drops_below_base() {
    // 10 min/day average would give 70 weekly; the 150 base wins.
    let stats = StudentStats { avg_daily_minutes: 10.0, total_sessions: 20, avg_rating: 3.5 };
    let tpl = &CHALLENGE_TEMPLATES[0];
    assert_eq!(tpl.kind, ChallengeKind::PracticeTime);
    let c = instantiate(tpl, &stats, Difficulty::Medium, "ada", ws());
    assert_eq!(c.target, 150.0);
  }

  #[test]
  fn rating_target_is_capped_at_five() {
    let stats = StudentStats { avg_daily_minutes: 60.0, total_sessions: 20, avg_rating: 4.9 };
    let tpl = &CHALLENGE_TEMPLATES[2];
    assert_eq!(tpl.kind, ChallengeKind::RatingImprovement);
    let c = instantiate(tpl, &stats, Difficulty::Hard, "ada", ws());
    assert!(c.target <= 5.0);
    assert!(c.target > 0.0);
  }

  #[test]
  fn skill_focus_description_names_the_counted_category() {
    // The progress metric counts technique minutes regardless of what the
    // student practiced recently; the description must say the same.
    let stats = StudentStats { avg_daily_minutes: 40.0, total_sessions: 20, avg_rating: 3.5 };
    let tpl = &CHALLENGE_TEMPLATES[3];
    assert_eq!(tpl.kind, ChallengeKind::SkillFocus);
    let c = instantiate(tpl, &stats, Difficulty::Medium, "ada", ws());
    assert!(c.description.contains("technique"), "description: {}", c.description);
  }

  #[test]
  fn overachievement_and_early_bonus_awarded_once() {
    // Scenario: target 150 minutes, 200 logged, finished with 2 days left.
    let mut store = HashMap::new();
    store.insert(
      (ws(), ChallengeKind::PracticeTime),
      base_challenge(ChallengeKind::PracticeTime, 150.0, 60),
    );
    let events = vec![
      event(3, 120, 4, FocusArea::Technique, "a"),
      event(4, 80, 4, FocusArea::Technique, "b"),
    ];
    // Friday: 2 days remaining (Sat, Sun).
    let today = d(7);
    let rewards = update_challenges(&mut store, &events, today, Utc::now());

    let c = &store[&(ws(), ChallengeKind::PracticeTime)];
    assert_eq!(c.status, ChallengeStatus::Completed);
    let expected_bonus = (60.0_f64 * 0.5 * (50.0 / 150.0)).floor() as u32 + 2 * 5;
    assert_eq!(c.bonus_points, expected_bonus);
    assert_eq!(rewards, vec![(ChallengeKind::PracticeTime, 60 + expected_bonus)]);

    // Second update: terminal, no second award, progress frozen.
    let rewards2 = update_challenges(&mut store, &events, today, Utc::now());
    assert!(rewards2.is_empty());
    let c = &store[&(ws(), ChallengeKind::PracticeTime)];
    assert_eq!(c.bonus_points, expected_bonus);
  }

  #[test]
  fn consecutive_days_uses_longest_in_week_run() {
    let mut store = HashMap::new();
    store.insert(
      (ws(), ChallengeKind::ConsecutiveDays),
      base_challenge(ChallengeKind::ConsecutiveDays, 5.0, 80),
    );
    // Mon, Tue practiced; Wed skipped; Thu, Fri, Sat practiced.
    let events: Vec<_> = [3, 4, 6, 7, 8]
      .into_iter()
      .map(|day| event(day, 30, 4, FocusArea::Rhythm, "p"))
      .collect();
    update_challenges(&mut store, &events, d(8), Utc::now());
    let c = &store[&(ws(), ChallengeKind::ConsecutiveDays)];
    assert_eq!(c.current_progress, 3.0);
    assert_eq!(c.status, ChallengeStatus::Active);
  }

  #[test]
  fn variety_counts_distinct_pieces_only() {
    let mut store = HashMap::new();
    store.insert(
      (ws(), ChallengeKind::VarietyPractice),
      base_challenge(ChallengeKind::VarietyPractice, 3.0, 40),
    );
    // Two sessions on the same piece count once.
    let events = vec![
      event(3, 30, 4, FocusArea::Technique, "gavotte"),
      event(3, 20, 4, FocusArea::Technique, "gavotte"),
    ];
    update_challenges(&mut store, &events, d(3), Utc::now());
    assert_eq!(store[&(ws(), ChallengeKind::VarietyPractice)].current_progress, 1.0);

    // A different piece advances it.
    let events = vec![
      event(3, 30, 4, FocusArea::Technique, "gavotte"),
      event(3, 20, 4, FocusArea::Technique, "minuet"),
    ];
    update_challenges(&mut store, &events, d(3), Utc::now());
    assert_eq!(store[&(ws(), ChallengeKind::VarietyPractice)].current_progress, 2.0);
  }

  #[test]
  fn unmet_challenge_expires_after_week_end() {
    let mut store = HashMap::new();
    store.insert(
      (ws(), ChallengeKind::PracticeTime),
      base_challenge(ChallengeKind::PracticeTime, 150.0, 60),
    );
    // The Monday after the challenge week.
    let rewards = update_challenges(&mut store, &[], d(10), Utc::now());
    assert!(rewards.is_empty());
    let c = &store[&(ws(), ChallengeKind::PracticeTime)];
    assert_eq!(c.status, ChallengeStatus::Expired);
    assert_eq!(c.bonus_points, 0);
  }

  #[test]
  fn skill_focus_counts_technique_minutes_only() {
    let mut store = HashMap::new();
    store.insert(
      (ws(), ChallengeKind::SkillFocus),
      base_challenge(ChallengeKind::SkillFocus, 60.0, 50),
    );
    let events = vec![
      event(3, 40, 4, FocusArea::Technique, "a"),
      event(4, 40, 4, FocusArea::Expression, "a"),
    ];
    update_challenges(&mut store, &events, d(4), Utc::now());
    let c = &store[&(ws(), ChallengeKind::SkillFocus)];
    assert_eq!(c.current_progress, 40.0);
    assert_eq!(c.status, ChallengeStatus::Active);
  }
}
