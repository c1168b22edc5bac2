//! Level / experience tracker: cumulative points, quadratic level thresholds
//! and the practice-streak state machine.

use chrono::{Duration, NaiveDate};
use tracing::{debug, error};

use crate::catalog::{starting_title, title_for_level};
use crate::domain::StudentLevelState;

/// Upper bound on level-ups applied by a single `add_experience` call.
/// Rewards are small integers; hitting this means a malformed value.
const MAX_LEVEL_UPS_PER_AWARD: u32 = 1000;

/// Total experience required to hold `level`. 0 for level 1, then grows
/// quadratically: (level - 1)^2 * 100.
pub fn required_experience(level: u32) -> u64 {
  if level <= 1 {
    0
  } else {
    (level as u64 - 1).pow(2) * 100
  }
}

impl StudentLevelState {
  pub fn new() -> Self {
    Self {
      level: 1,
      total_points: 0,
      current_experience: 0,
      current_streak: 0,
      longest_streak: 0,
      title: starting_title().into(),
      last_practice_date: None,
      total_practice_time: 0,
    }
  }

  /// Experience still missing before the next level.
  pub fn experience_to_next_level(&self) -> u64 {
    required_experience(self.level + 1).saturating_sub(self.current_experience)
  }

  /// Position within the current level band, 0-100.
  pub fn experience_progress_percentage(&self) -> f64 {
    let floor = required_experience(self.level);
    let ceil = required_experience(self.level + 1);
    if ceil == floor {
      return 100.0;
    }
    let p = (self.current_experience.saturating_sub(floor)) as f64 / (ceil - floor) as f64;
    (p * 100.0).clamp(0.0, 100.0)
  }

  /// Add reward points, applying as many level-ups as the new experience
  /// covers. Returns the (possibly unchanged) level afterwards.
  pub fn add_experience(&mut self, points: u32) -> u32 {
    self.current_experience += points as u64;
    self.total_points += points as u64;

    let mut ups = 0u32;
    while self.current_experience >= required_experience(self.level + 1) {
      if ups >= MAX_LEVEL_UPS_PER_AWARD {
        error!(target: "gamify_backend", points, level = self.level, "Level-up cap hit; refusing further level-ups for this award");
        break;
      }
      self.level += 1;
      ups += 1;
    }
    if ups > 0 {
      self.title = title_for_level(self.level).into();
      debug!(target: "gamify_backend", level = self.level, title = %self.title, "Level up");
    }
    self.level
  }

  /// Streak transition for one practice date:
  /// - first event ever: streak = 1
  /// - same day again: no change
  /// - the day after the last: streak + 1
  /// - anything later: reset to 1
  /// - anything earlier (backfill): streak untouched, anchor kept
  ///
  /// `longest_streak` tracks the maximum ever reached, and the anchor date
  /// only ever moves forward.
  pub fn update_streak(&mut self, practice_date: NaiveDate) {
    match self.last_practice_date {
      None => {
        self.current_streak = 1;
        self.last_practice_date = Some(practice_date);
      }
      Some(last) if practice_date == last => return,
      Some(last) if practice_date < last => return,
      Some(last) => {
        if practice_date == last + Duration::days(1) {
          self.current_streak += 1;
        } else {
          self.current_streak = 1;
        }
        self.last_practice_date = Some(practice_date);
      }
    }
    if self.current_streak > self.longest_streak {
      self.longest_streak = self.current_streak;
    }
  }
}
