//! Progress evaluator: per-requirement scoring of achievements over a
//! student's practice history.
//!
//! Every formula yields a 0-100 score; crossing 100 flips the badge to
//! earned exactly once. A failure in one formula is logged and skipped so
//! the remaining badges still get evaluated.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::catalog::AchievementCatalog;
use crate::domain::{
  AchievementDefinition, AchievementProgress, FocusArea, PracticeEvent, Requirement,
  StudentLevelState,
};
use crate::error::{GamifyError, Result};

/// Evaluate all active, not-yet-earned achievements for one student.
/// Updates the progress map in place and returns the newly earned
/// definitions; the caller routes their reward points to the level tracker.
pub fn evaluate_achievements(
  catalog: &AchievementCatalog,
  events: &[PracticeEvent],
  level: &StudentLevelState,
  progress: &mut HashMap<String, AchievementProgress>,
  today: NaiveDate,
  now: DateTime<Utc>,
) -> Vec<AchievementDefinition> {
  let mut newly_earned = Vec::new();

  for def in catalog.active() {
    let entry = progress
      .entry(def.name.clone())
      .or_insert_with(AchievementProgress::new);

    // Earned badges are terminal; never re-scored.
    if entry.is_earned {
      continue;
    }

    let score = match compute_progress(def.requirement, events, level, today) {
      Ok(s) => s,
      Err(e) => {
        warn!(target: "achievement", badge = %def.name, error = %e, "Skipping badge after scoring failure");
        continue;
      }
    };

    if score >= 100.0 {
      entry.mark_earned(now);
      info!(target: "achievement", badge = %def.name, points = def.points, "Achievement earned");
      newly_earned.push(def.clone());
    } else {
      entry.progress = score.clamp(0.0, 100.0);
    }
  }

  newly_earned
}

/// Score one requirement against the full history. Statically dispatched on
/// the requirement variant.
pub fn compute_progress(
  requirement: Requirement,
  events: &[PracticeEvent],
  level: &StudentLevelState,
  today: NaiveDate,
) -> Result<f64> {
  match requirement {
    Requirement::ConsecutiveDays(days) => {
      let days = nonzero(days)?;
      Ok(level.current_streak as f64 / days as f64 * 100.0)
    }
    Requirement::TotalHours(hours) => {
      let hours = positive(hours)?;
      let total: u64 = events.iter().map(|e| e.minutes as u64).sum();
      Ok(total as f64 / 60.0 / hours * 100.0)
    }
    Requirement::AverageRating(rating) => {
      let rating = positive(rating)?;
      if events.is_empty() {
        return Ok(0.0);
      }
      let sum: u64 = events.iter().map(|e| e.rating as u64).sum();
      let avg = sum as f64 / events.len() as f64;
      Ok(avg / rating * 100.0)
    }
    Requirement::FocusHours(hours) => {
      let hours = positive(hours)?;
      let total: u64 = events
        .iter()
        .filter(|e| e.focus == FocusArea::Technique)
        .map(|e| e.minutes as u64)
        .sum();
      Ok(total as f64 / 60.0 / hours * 100.0)
    }
    Requirement::TotalSessions(sessions) => {
      let sessions = nonzero(sessions)?;
      Ok(events.len() as f64 / sessions as f64 * 100.0)
    }
    Requirement::WeekConsistency(weeks) => {
      let weeks = nonzero(weeks)?;
      Ok(week_consistency_score(events, weeks, today))
    }
  }
}

/// Of the last `weeks` ISO weeks, the share containing at least three
/// distinct practice days.
fn week_consistency_score(events: &[PracticeEvent], weeks: u32, today: NaiveDate) -> f64 {
  let cutoff = today - Duration::weeks(weeks as i64);

  let dates: HashSet<NaiveDate> = events
    .iter()
    .filter(|e| e.date >= cutoff)
    .map(|e| e.date)
    .collect();

  let mut days_per_week: HashMap<(i32, u32), u32> = HashMap::new();
  for date in dates {
    let iso = date.iso_week();
    *days_per_week.entry((iso.year(), iso.week())).or_insert(0) += 1;
  }

  let consistent = days_per_week.values().filter(|&&d| d >= 3).count();
  consistent as f64 / weeks as f64 * 100.0
}

fn nonzero(v: u32) -> Result<u32> {
  if v == 0 {
    Err(GamifyError::Computation("requirement threshold is zero".into()))
  } else {
    Ok(v)
  }
}

fn positive(v: f64) -> Result<f64> {
  if v > 0.0 && v.is_finite() {
    Ok(v)
  } else {
    Err(GamifyError::Computation(format!("requirement threshold {v} is not positive")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::default_achievements;
  use crate::domain::{AchievementCategory, Rarity};

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
  }

  fn event(day: u32, minutes: u32, rating: u8, focus: FocusArea) -> PracticeEvent {
    PracticeEvent {
      student: "ada".into(),
      date: d(day),
      minutes,
      rating,
      focus,
      piece: String::new(),
      note: String::new(),
    }
  }

  fn catalog() -> AchievementCatalog {
    AchievementCatalog::new(default_achievements())
  }

  #[test]
  fn total_hours_formula() {
    let events = vec![
      event(1, 120, 4, FocusArea::Technique),
      event(2, 180, 5, FocusArea::Rhythm),
    ];
    let level = StudentLevelState::new();
    // 5 hours against a 10 hour threshold.
    let p = compute_progress(Requirement::TotalHours(10.0), &events, &level, d(3)).unwrap();
    assert!((p - 50.0).abs() < 1e-9);
  }

  #[test]
  fn focus_hours_only_counts_technique() {
    let events = vec![
      event(1, 60, 4, FocusArea::Technique),
      event(2, 60, 4, FocusArea::Expression),
    ];
    let level = StudentLevelState::new();
    let p = compute_progress(Requirement::FocusHours(2.0), &events, &level, d(3)).unwrap();
    assert!((p - 50.0).abs() < 1e-9);
  }

  #[test]
  fn average_rating_on_empty_history_is_zero() {
    let level = StudentLevelState::new();
    let p = compute_progress(Requirement::AverageRating(4.0), &[], &level, d(1)).unwrap();
    assert_eq!(p, 0.0);
  }

  #[test]
  fn consecutive_days_reads_streak_state_not_history() {
    let mut level = StudentLevelState::new();
    for day in 1..=6 {
      level.update_streak(d(day));
    }
    let p = compute_progress(Requirement::ConsecutiveDays(7), &[], &level, d(6)).unwrap();
    assert!((p - 6.0 / 7.0 * 100.0).abs() < 1e-9);
  }

  #[test]
  fn week_consistency_counts_weeks_with_three_distinct_days() {
    // Week of Jun 3: Mon/Tue/Wed practiced (3 distinct days).
    // Week of Jun 10: only Mon practiced.
    let events = vec![
      event(3, 30, 4, FocusArea::Technique),
      event(4, 30, 4, FocusArea::Technique),
      event(5, 30, 4, FocusArea::Technique),
      event(5, 45, 4, FocusArea::Rhythm), // same day twice still one day
      event(10, 30, 4, FocusArea::Technique),
    ];
    let level = StudentLevelState::new();
    let p = compute_progress(Requirement::WeekConsistency(4), &events, &level, d(12)).unwrap();
    assert!((p - 25.0).abs() < 1e-9);
  }

  #[test]
  fn progress_is_clamped_and_earning_is_terminal() {
    let mut progress = HashMap::new();
    let level = StudentLevelState::new();
    // 40 hours against the 10 hour badge: raw score 400.
    let events: Vec<_> = (1..=8)
      .map(|day| event(day, 300, 5, FocusArea::Technique))
      .collect();
    let earned = evaluate_achievements(&catalog(), &events, &level, &mut progress, d(9), Utc::now());
    assert!(earned.iter().any(|a| a.name == "Time Keeper"));

    let tk = &progress["Time Keeper"];
    assert!(tk.is_earned);
    assert_eq!(tk.progress, 100.0);
    assert!(tk.earned_at.is_some());
    for p in progress.values() {
      assert!((0.0..=100.0).contains(&p.progress));
    }

    // Second pass: nothing newly earned, progress pinned at 100.
    let earned2 =
      evaluate_achievements(&catalog(), &events, &level, &mut progress, d(9), Utc::now());
    assert!(earned2.is_empty());
    assert_eq!(progress["Time Keeper"].progress, 100.0);
    assert!(progress["Time Keeper"].is_earned);
  }

  #[test]
  fn one_bad_badge_does_not_block_the_rest() {
    let mut defs = default_achievements();
    defs.push(AchievementDefinition {
      name: "Broken".into(),
      description: String::new(),
      icon: "x".into(),
      category: AchievementCategory::Milestone,
      requirement: Requirement::TotalHours(0.0), // unscorable
      points: 10,
      rarity: Rarity::Common,
      is_active: true,
    });
    let cat = AchievementCatalog::new(defs);
    let events = vec![event(1, 600, 5, FocusArea::Technique)];
    let level = StudentLevelState::new();
    let mut progress = HashMap::new();
    let earned = evaluate_achievements(&cat, &events, &level, &mut progress, d(2), Utc::now());
    // The broken badge is skipped, the 10h badge still earns.
    assert!(earned.iter().any(|a| a.name == "Time Keeper"));
    assert!(!progress["Broken"].is_earned);
  }

  #[test]
  fn inactive_badges_are_never_evaluated() {
    let mut defs = default_achievements();
    for d in &mut defs {
      d.is_active = false;
    }
    let cat = AchievementCatalog::new(defs);
    let mut progress = HashMap::new();
    let level = StudentLevelState::new();
    let earned = evaluate_achievements(&cat, &[], &level, &mut progress, d(1), Utc::now());
    assert!(earned.is_empty());
    assert!(progress.is_empty());
  }
}
