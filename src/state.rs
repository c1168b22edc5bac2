//! Application state: the read-only achievement catalog and the per-student
//! record map.
//!
//! Concurrency model: the catalog is immutable after startup and shared via
//! `Arc`. Everything mutable for one student (events, level state, badge
//! progress, challenges, tasks) lives in a single `StudentRecord` behind a
//! per-student `Mutex`; the whole gamification cascade for one event runs
//! under that lock, so concurrent submissions for the same student cannot
//! double-award points or corrupt streak transitions. The outer map is only
//! locked for entry lookup/creation.

use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument};

use crate::catalog::{default_achievements, AchievementCatalog};
use crate::config::load_catalog_config_from_env;
use crate::domain::{
    AchievementDefinition, AchievementProgress, ChallengeKind, PracticeEvent, PracticeTask,
    StudentLevelState, WeeklyChallenge,
};

/// All mutable state for one student.
pub struct StudentRecord {
    pub events: Vec<PracticeEvent>,
    /// None until the first practice event or explicit initialization.
    pub level: Option<StudentLevelState>,
    /// Keyed by achievement name.
    pub achievements: HashMap<String, AchievementProgress>,
    /// Keyed by (week_start, kind); the uniqueness constraint lives in the
    /// key itself.
    pub challenges: HashMap<(NaiveDate, ChallengeKind), WeeklyChallenge>,
    pub tasks: Vec<PracticeTask>,
}

impl StudentRecord {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            level: None,
            achievements: HashMap::new(),
            challenges: HashMap::new(),
            tasks: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<AchievementCatalog>,
    students: Arc<RwLock<HashMap<String, Arc<Mutex<StudentRecord>>>>>,
}

impl AppState {
    /// Build state from env: load the optional TOML catalog, merge in the
    /// built-in bank, log the inventory.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_catalog_config_from_env();

        let mut defs: Vec<AchievementDefinition> = Vec::new();

        // Config-provided badges first (they take precedence by name).
        if let Some(cfg) = cfg_opt {
            for def in cfg.achievements {
                if def.points == 0 {
                    error!(target: "achievement", badge = %def.name, "Skipping catalog entry: reward points must be positive");
                    continue;
                }
                if defs.iter().any(|d: &AchievementDefinition| d.name == def.name) {
                    error!(target: "achievement", badge = %def.name, "Skipping catalog entry: duplicate name");
                    continue;
                }
                defs.push(def);
            }
        }

        // Always merge the built-in bank, without overwriting overrides.
        for def in default_achievements() {
            if !defs.iter().any(|d| d.name == def.name) {
                defs.push(def);
            }
        }

        let active = defs.iter().filter(|d| d.is_active).count();
        info!(target: "achievement", total = defs.len(), active, "Startup achievement inventory");

        Self {
            catalog: Arc::new(AchievementCatalog::new(defs)),
            students: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or lazily create the record for a student.
    #[instrument(level = "debug", skip(self))]
    pub async fn student(&self, name: &str) -> Arc<Mutex<StudentRecord>> {
        {
            let students = self.students.read().await;
            if let Some(rec) = students.get(name) {
                return rec.clone();
            }
        }
        let mut students = self.students.write().await;
        students
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(StudentRecord::new())))
            .clone()
    }

    /// Record lookup without creating one. Readers use this so that asking
    /// about an unknown student does not materialize state.
    pub async fn student_if_exists(&self, name: &str) -> Option<Arc<Mutex<StudentRecord>>> {
        self.students.read().await.get(name).cloned()
    }

    /// Snapshot of all (name, record) pairs, for leaderboard-style scans.
    pub async fn all_students(&self) -> Vec<(String, Arc<Mutex<StudentRecord>>)> {
        self.students
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_are_created_lazily_and_shared() {
        let state = AppState::new();
        assert!(state.student_if_exists("ada").await.is_none());

        let a = state.student("ada").await;
        let b = state.student("ada").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(state.student_if_exists("ada").await.is_some());
    }

    #[tokio::test]
    async fn default_catalog_loads_when_no_config_is_present() {
        let state = AppState::new();
        assert_eq!(state.catalog.len(), 10);
        assert!(state.catalog.get("Time Keeper").is_some());
    }
}
