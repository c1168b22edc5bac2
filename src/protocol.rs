//! Public wire structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AchievementCategory, AchievementDefinition, AchievementProgress, ChallengeKind,
    ChallengeStatus, Difficulty, FocusArea, PracticeTask, Rarity, StudentLevelState, TaskPriority,
    WeeklyChallenge,
};
//
// Practice event ingestion
//

#[derive(Debug, Deserialize)]
pub struct PracticeIn {
    pub student: String,
    pub date: NaiveDate,
    pub minutes: u32,
    pub rating: u8,
    pub focus: FocusArea,
    #[serde(default)]
    pub piece: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct PracticeOut {
    #[serde(rename = "newlyEarned")]
    pub newly_earned: Vec<AchievementOut>,
    #[serde(rename = "completedChallenges")]
    pub completed_challenges: Vec<ChallengeKind>,
    pub level: LevelInfoOut,
}

//
// Level info
//

#[derive(Clone, Debug, Serialize)]
pub struct LevelInfoOut {
    pub level: u32,
    pub title: String,
    #[serde(rename = "totalPoints")]
    pub total_points: u64,
    #[serde(rename = "currentExperience")]
    pub current_experience: u64,
    #[serde(rename = "experienceToNextLevel")]
    pub experience_to_next_level: u64,
    #[serde(rename = "progressPercentage")]
    pub progress_percentage: f64,
    #[serde(rename = "currentStreak")]
    pub current_streak: u32,
    #[serde(rename = "longestStreak")]
    pub longest_streak: u32,
    #[serde(rename = "totalPracticeTime")]
    pub total_practice_time: u64,
}

pub fn level_info_out(s: &StudentLevelState) -> LevelInfoOut {
    LevelInfoOut {
        level: s.level,
        title: s.title.clone(),
        total_points: s.total_points,
        current_experience: s.current_experience,
        experience_to_next_level: s.experience_to_next_level(),
        progress_percentage: s.experience_progress_percentage(),
        current_streak: s.current_streak,
        longest_streak: s.longest_streak,
        total_practice_time: s.total_practice_time,
    }
}

/// Envelope for `GET /level`: a fresh student renders as "not yet started",
/// never as an error.
#[derive(Debug, Serialize)]
pub struct LevelEnvelopeOut {
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<LevelInfoOut>,
}

//
// Achievements
//

#[derive(Clone, Debug, Serialize)]
pub struct AchievementOut {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub points: u32,
    pub progress: f64,
    #[serde(rename = "isEarned")]
    pub is_earned: bool,
    #[serde(rename = "earnedAt")]
    pub earned_at: Option<DateTime<Utc>>,
}

pub fn achievement_out(def: &AchievementDefinition, p: &AchievementProgress) -> AchievementOut {
    AchievementOut {
        name: def.name.clone(),
        description: def.description.clone(),
        icon: def.icon.clone(),
        category: def.category,
        rarity: def.rarity,
        points: def.points,
        progress: p.progress,
        is_earned: p.is_earned,
        earned_at: p.earned_at,
    }
}

//
// Challenges
//

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeOut {
    pub kind: ChallengeKind,
    pub title: String,
    pub description: String,
    #[serde(rename = "weekStart")]
    pub week_start: NaiveDate,
    pub target: f64,
    pub progress: f64,
    #[serde(rename = "progressPercentage")]
    pub progress_percentage: f64,
    pub difficulty: Difficulty,
    pub status: ChallengeStatus,
    pub reward: u32,
    pub bonus: u32,
}

pub fn challenge_out(c: &WeeklyChallenge) -> ChallengeOut {
    ChallengeOut {
        kind: c.kind,
        title: c.title.clone(),
        description: c.description.clone(),
        week_start: c.week_start,
        target: c.target,
        progress: c.current_progress,
        progress_percentage: c.progress_percentage(),
        difficulty: c.difficulty,
        status: c.status,
        reward: c.points_reward,
        bonus: c.bonus_points,
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeStatsOut {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    #[serde(rename = "pointsEarned")]
    pub points_earned: u64,
    #[serde(rename = "completionRate")]
    pub completion_rate: f64,
}

//
// Suggestions
//

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Serialize)]
pub struct SuggestionOut {
    pub kind: String,
    pub message: String,
    pub action: String,
    pub priority: SuggestionPriority,
}

//
// Tasks
//

#[derive(Debug, Deserialize)]
pub struct TaskIn {
    pub student: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "dueDate")]
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    #[serde(rename = "pointsReward", default = "default_task_points")]
    pub points_reward: u32,
}

fn default_task_points() -> u32 {
    25
}

#[derive(Debug, Deserialize)]
pub struct TaskCompleteIn {
    pub student: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct TaskOut {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "dueDate")]
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    #[serde(rename = "pointsReward")]
    pub points_reward: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    #[serde(rename = "isOverdue")]
    pub is_overdue: bool,
}

pub fn task_out(t: &PracticeTask, today: NaiveDate) -> TaskOut {
    TaskOut {
        id: t.id.clone(),
        title: t.title.clone(),
        description: t.description.clone(),
        due_date: t.due_date,
        priority: t.priority,
        points_reward: t.points_reward,
        is_completed: t.is_completed,
        is_overdue: t.is_overdue(today),
    }
}

//
// Dashboard & leaderboard
//

#[derive(Debug, Serialize)]
pub struct WeekStatsOut {
    #[serde(rename = "totalMinutes")]
    pub total_minutes: u64,
    #[serde(rename = "totalSessions")]
    pub total_sessions: usize,
    #[serde(rename = "avgRating")]
    pub avg_rating: f64,
    #[serde(rename = "practiceDays")]
    pub practice_days: usize,
    #[serde(rename = "targetDays")]
    pub target_days: u32,
    #[serde(rename = "daysRemaining")]
    pub days_remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardOut {
    pub student: String,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelInfoOut>,
    #[serde(rename = "recentAchievements")]
    pub recent_achievements: Vec<AchievementOut>,
    #[serde(rename = "currentChallenges")]
    pub current_challenges: Vec<ChallengeOut>,
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: Vec<TaskOut>,
    #[serde(rename = "weekStats")]
    pub week_stats: WeekStatsOut,
    #[serde(rename = "challengeStats")]
    pub challenge_stats: ChallengeStatsOut,
    pub motivation: String,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntryOut {
    pub rank: usize,
    pub student: String,
    pub level: u32,
    pub title: String,
    #[serde(rename = "totalPoints")]
    pub total_points: u64,
    #[serde(rename = "currentStreak")]
    pub current_streak: u32,
    #[serde(rename = "longestStreak")]
    pub longest_streak: u32,
    #[serde(rename = "recentMinutes")]
    pub recent_minutes: u64,
    #[serde(rename = "recentAvgRating")]
    pub recent_avg_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct InitOut {
    pub level: LevelInfoOut,
    pub challenges: Vec<ChallengeOut>,
    #[serde(rename = "newlyEarned")]
    pub newly_earned: Vec<AchievementOut>,
}

//
// Queries
//

#[derive(Debug, Deserialize)]
pub struct StudentQuery {
    pub student: String,
}

#[derive(Debug, Deserialize)]
pub struct AchievementsQuery {
    pub student: String,
    pub category: Option<AchievementCategory>,
    #[serde(rename = "earnedOnly", default)]
    pub earned_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChallengesQuery {
    pub student: String,
    #[serde(rename = "weekStart")]
    pub week_start: Option<NaiveDate>,
    pub status: Option<ChallengeStatus>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatusFilter {
    Active,
    Completed,
    Overdue,
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub student: String,
    pub status: Option<TaskStatusFilter>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_info_serializes_with_camel_case_names() {
        let s = StudentLevelState {
            level: 2,
            total_points: 150,
            current_experience: 150,
            current_streak: 3,
            longest_streak: 4,
            title: "Apprentice".into(),
            last_practice_date: None,
            total_practice_time: 90,
        };
        let v = serde_json::to_value(level_info_out(&s)).unwrap();
        assert_eq!(v["totalPoints"], 150);
        assert_eq!(v["experienceToNextLevel"], 250);
        assert_eq!(v["currentStreak"], 3);
        assert_eq!(v["totalPracticeTime"], 90);
        // No snake_case leaks onto the wire.
        assert!(v.get("total_points").is_none());
    }

    #[test]
    fn challenge_serializes_status_and_kind_as_snake_case_values() {
        let c = WeeklyChallenge {
            student: "ada".into(),
            week_start: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            kind: ChallengeKind::PracticeTime,
            title: "Weekly Practice Champion".into(),
            description: String::new(),
            target: 150.0,
            current_progress: 75.0,
            difficulty: Difficulty::Medium,
            points_reward: 60,
            bonus_points: 0,
            status: ChallengeStatus::Active,
            completed_at: None,
        };
        let v = serde_json::to_value(challenge_out(&c)).unwrap();
        assert_eq!(v["weekStart"], "2024-06-03");
        assert_eq!(v["kind"], "practice_time");
        assert_eq!(v["status"], "active");
        assert_eq!(v["progressPercentage"], 50.0);
    }
}
