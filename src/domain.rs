//! Domain models: practice events, achievement definitions and progress,
//! per-student level state, weekly challenges and practice tasks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{days_remaining, week_end_of};

/// What the student concentrated on during one session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
  Technique,
  Expression,
  Rhythm,
  SightReading,
  Memorization,
  Ensemble,
  Other,
}

impl FocusArea {
  pub fn display_name(&self) -> &'static str {
    match self {
      FocusArea::Technique => "technique",
      FocusArea::Expression => "expression",
      FocusArea::Rhythm => "rhythm",
      FocusArea::SightReading => "sight reading",
      FocusArea::Memorization => "memorization",
      FocusArea::Ensemble => "ensemble",
      FocusArea::Other => "general",
    }
  }
}

/// One recorded practice session. Immutable once stored; the sole trigger
/// for the gamification cascade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PracticeEvent {
  pub student: String,
  pub date: NaiveDate,
  pub minutes: u32,
  /// Self-rating, 1-5.
  pub rating: u8,
  pub focus: FocusArea,
  /// Piece practiced; feeds variety challenges.
  #[serde(default)]
  pub piece: String,
  #[serde(default)]
  pub note: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
  Persistence,
  Quality,
  Milestone,
  Skill,
  Challenge,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
  #[default]
  Common,
  Rare,
  Epic,
  Legendary,
}

/// Achievement requirement, tagged by kind with its numeric threshold.
/// Progress formulas dispatch on this enum; there is no string matching
/// at evaluation time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Requirement {
  /// Current streak reaches N days.
  ConsecutiveDays(u32),
  /// Lifetime practice reaches N hours.
  TotalHours(f64),
  /// Lifetime average self-rating reaches N.
  AverageRating(f64),
  /// Technique-focused practice reaches N hours.
  FocusHours(f64),
  /// Lifetime session count reaches N.
  TotalSessions(u32),
  /// N of the last N ISO weeks each contain >= 3 distinct practice days.
  WeekConsistency(u32),
}

/// One badge in the catalog. Reference data, loaded once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AchievementDefinition {
  /// Unique within the catalog; the progress-store key.
  pub name: String,
  pub description: String,
  #[serde(default = "default_icon")]
  pub icon: String,
  pub category: AchievementCategory,
  pub requirement: Requirement,
  /// Reward routed to the level tracker when earned.
  pub points: u32,
  #[serde(default)]
  pub rarity: Rarity,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

fn default_icon() -> String {
  "🏆".into()
}
fn default_true() -> bool {
  true
}

/// Per-(student, achievement) progress. Terminal once earned: progress pins
/// at 100 and the pair is never re-evaluated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AchievementProgress {
  pub progress: f64,
  pub is_earned: bool,
  pub earned_at: Option<DateTime<Utc>>,
}

impl AchievementProgress {
  pub fn new() -> Self {
    Self { progress: 0.0, is_earned: false, earned_at: None }
  }

  pub fn mark_earned(&mut self, at: DateTime<Utc>) {
    self.is_earned = true;
    self.progress = 100.0;
    self.earned_at = Some(at);
  }
}

/// Cumulative progression state, one per student.
/// `total_points` only ever grows; streak fields obey the streak law in
/// `level.rs`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudentLevelState {
  pub level: u32,
  pub total_points: u64,
  pub current_experience: u64,
  pub current_streak: u32,
  pub longest_streak: u32,
  pub title: String,
  pub last_practice_date: Option<NaiveDate>,
  /// Lifetime minutes.
  pub total_practice_time: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
  PracticeTime,
  ConsecutiveDays,
  RatingImprovement,
  SkillFocus,
  VarietyPractice,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
  Active,
  Completed,
  Expired,
}

/// One weekly goal, unique per (student, week_start, kind).
/// Completed and Expired are terminal; no transition leaves them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeeklyChallenge {
  pub student: String,
  /// Monday of the challenge week.
  pub week_start: NaiveDate,
  pub kind: ChallengeKind,
  pub title: String,
  pub description: String,
  pub target: f64,
  pub current_progress: f64,
  pub difficulty: Difficulty,
  pub points_reward: u32,
  pub bonus_points: u32,
  pub status: ChallengeStatus,
  pub completed_at: Option<DateTime<Utc>>,
}

impl WeeklyChallenge {
  pub fn week_end(&self) -> NaiveDate {
    week_end_of(self.week_start)
  }

  pub fn progress_percentage(&self) -> f64 {
    if self.target <= 0.0 {
      return 0.0;
    }
    (self.current_progress / self.target * 100.0).min(100.0)
  }

  pub fn days_remaining(&self, today: NaiveDate) -> i64 {
    days_remaining(self.week_start, today)
  }

  /// Base reward plus any overachievement / early-completion bonus.
  pub fn total_points(&self) -> u32 {
    self.points_reward + self.bonus_points
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
  Low,
  Medium,
  High,
  Urgent,
}

/// Lightweight assigned to-do. No algorithmic core; completing one routes
/// its reward through the level tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PracticeTask {
  pub id: String,
  pub student: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub due_date: NaiveDate,
  pub priority: TaskPriority,
  pub points_reward: u32,
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub completion_notes: String,
}

impl PracticeTask {
  pub fn is_overdue(&self, today: NaiveDate) -> bool {
    !self.is_completed && today > self.due_date
  }
}
