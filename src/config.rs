//! Loading the optional achievement-bank override from TOML.
//!
//! Set `CATALOG_PATH` to a TOML file with an `[[achievements]]` array to add
//! badges beyond the built-in bank. Entries share the shape of
//! `AchievementDefinition`; `icon`, `rarity` and `is_active` are optional.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::AchievementDefinition;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogConfig {
  #[serde(default)]
  pub achievements: Vec<AchievementDefinition>,
}

/// Attempt to load `CatalogConfig` from CATALOG_PATH. On any parsing/IO
/// error, returns None; startup never fails on bad config.
pub fn load_catalog_config_from_env() -> Option<CatalogConfig> {
  let path = std::env::var("CATALOG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<CatalogConfig>(&s) {
      Ok(cfg) => {
        info!(target: "gamify_backend", %path, badges = cfg.achievements.len(), "Loaded achievement catalog (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "gamify_backend", %path, error = %e, "Failed to parse TOML catalog");
        None
      }
    },
    Err(e) => {
      error!(target: "gamify_backend", %path, error = %e, "Failed to read TOML catalog file");
      None
    }
  }
}
