//! Built-in reference data: the default achievement bank, the weekly
//! challenge template table, and the sparse level-title ladder.
//!
//! The achievement bank can be extended or overridden from TOML (see
//! `config.rs`); these defaults guarantee the engine is useful without any
//! external configuration.

use crate::domain::{
  AchievementCategory, AchievementDefinition, ChallengeKind, Difficulty, Rarity, Requirement,
};

/// Read-only achievement catalog, loaded once at startup and shared.
pub struct AchievementCatalog {
  defs: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
  pub fn new(defs: Vec<AchievementDefinition>) -> Self {
    Self { defs }
  }

  /// Definitions the evaluator considers. Inactive badges are never
  /// checked or earned.
  pub fn active(&self) -> impl Iterator<Item = &AchievementDefinition> {
    self.defs.iter().filter(|d| d.is_active)
  }

  pub fn len(&self) -> usize {
    self.defs.len()
  }

  pub fn get(&self, name: &str) -> Option<&AchievementDefinition> {
    self.defs.iter().find(|d| d.name == name)
  }
}

fn def(
  name: &str,
  description: &str,
  icon: &str,
  category: AchievementCategory,
  requirement: Requirement,
  points: u32,
  rarity: Rarity,
) -> AchievementDefinition {
  AchievementDefinition {
    name: name.into(),
    description: description.into(),
    icon: icon.into(),
    category,
    requirement,
    points,
    rarity,
    is_active: true,
  }
}

/// The ten built-in badges.
pub fn default_achievements() -> Vec<AchievementDefinition> {
  use AchievementCategory::*;
  vec![
    // Persistence
    def(
      "First Spark",
      "Practice 3 days in a row and show your resolve.",
      "🔥",
      Persistence,
      Requirement::ConsecutiveDays(3),
      20,
      Rarity::Common,
    ),
    def(
      "Unbroken Week",
      "Practice every day for a week. A habit is forming.",
      "🌟",
      Persistence,
      Requirement::ConsecutiveDays(7),
      50,
      Rarity::Rare,
    ),
    def(
      "Iron Will",
      "Practice every day for a month.",
      "💎",
      Persistence,
      Requirement::ConsecutiveDays(30),
      200,
      Rarity::Epic,
    ),
    // Milestones
    def(
      "Time Keeper",
      "Accumulate 10 hours of practice.",
      "⏰",
      Milestone,
      Requirement::TotalHours(10.0),
      30,
      Rarity::Common,
    ),
    def(
      "Diligent Student",
      "Accumulate 100 hours of practice.",
      "📚",
      Milestone,
      Requirement::TotalHours(100.0),
      150,
      Rarity::Rare,
    ),
    def(
      "Practice Master",
      "Accumulate 500 hours of practice.",
      "🏆",
      Milestone,
      Requirement::TotalHours(500.0),
      500,
      Rarity::Legendary,
    ),
    // Quality
    def(
      "Quality Seeker",
      "Reach an average self-rating of 4.0.",
      "⭐",
      Quality,
      Requirement::AverageRating(4.0),
      40,
      Rarity::Rare,
    ),
    def(
      "Perfectionist",
      "Reach an average self-rating of 4.5.",
      "🌟",
      Quality,
      Requirement::AverageRating(4.5),
      80,
      Rarity::Epic,
    ),
    // Skill
    def(
      "Technique Expert",
      "Log 20 hours of technique-focused practice.",
      "🎯",
      Skill,
      Requirement::FocusHours(20.0),
      60,
      Rarity::Rare,
    ),
    // Session count
    def(
      "Steady Hands",
      "Complete 50 practice sessions.",
      "📝",
      Milestone,
      Requirement::TotalSessions(50),
      75,
      Rarity::Rare,
    ),
  ]
}

/// Template from which weekly challenges are instantiated.
pub struct ChallengeTemplate {
  pub kind: ChallengeKind,
  pub title: &'static str,
  /// `{target}` and `{focus}` placeholders, filled at generation time.
  pub description: &'static str,
  pub base_target: f64,
  multipliers: [f64; 3], // easy / medium / hard
  pub base_points: u32,
}

impl ChallengeTemplate {
  pub fn multiplier(&self, difficulty: Difficulty) -> f64 {
    match difficulty {
      Difficulty::Easy => self.multipliers[0],
      Difficulty::Medium => self.multipliers[1],
      Difficulty::Hard => self.multipliers[2],
    }
  }
}

pub const CHALLENGE_TEMPLATES: [ChallengeTemplate; 5] = [
  ChallengeTemplate {
    kind: ChallengeKind::PracticeTime,
    title: "Weekly Practice Champion",
    description: "Log {target} minutes of practice this week",
    base_target: 150.0,
    multipliers: [0.7, 1.0, 1.3],
    base_points: 60,
  },
  ChallengeTemplate {
    kind: ChallengeKind::ConsecutiveDays,
    title: "Keep The Chain Going",
    description: "Practice {target} days in a row this week",
    base_target: 5.0,
    multipliers: [0.6, 1.0, 1.4],
    base_points: 80,
  },
  ChallengeTemplate {
    kind: ChallengeKind::RatingImprovement,
    title: "Quality Push",
    description: "Reach an average rating of {target} this week",
    base_target: 4.0,
    multipliers: [0.9, 1.0, 1.1],
    base_points: 70,
  },
  ChallengeTemplate {
    kind: ChallengeKind::SkillFocus,
    title: "Skill Deep Dive",
    description: "Spend {target} minutes on {focus} this week",
    base_target: 60.0,
    multipliers: [0.8, 1.0, 1.2],
    base_points: 50,
  },
  ChallengeTemplate {
    kind: ChallengeKind::VarietyPractice,
    title: "Mix It Up",
    description: "Practice {target} different pieces this week",
    base_target: 3.0,
    multipliers: [0.7, 1.0, 1.5],
    base_points: 40,
  },
];

/// Sparse level -> title ladder. The entry for the highest defined level
/// at or below the student's level applies.
const TITLES: [(u32, &str); 10] = [
  (1, "Beginner"),
  (2, "Apprentice"),
  (3, "Novice"),
  (5, "Melody Explorer"),
  (8, "String Scholar"),
  (12, "Melody Weaver"),
  (17, "Harmony Master"),
  (23, "Music Poet"),
  (30, "Virtuoso"),
  (40, "Living Legend"),
];

pub fn starting_title() -> &'static str {
  TITLES[0].1
}

pub fn title_for_level(level: u32) -> &'static str {
  let mut current = TITLES[0].1;
  for (lv, title) in TITLES {
    if lv <= level {
      current = title;
    } else {
      break;
    }
  }
  current
}
