//! Configuration.
//!
//! One JSON document; every key is optional and falls back to its default, so
//! an empty `{}` (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::coordinator::CoordinatorSettings;
use crate::domain::{CategoryId, StyleConfig};
use crate::impls::{LOCK_FILE, RESULTS_DIR, TASKS_DIR};
use crate::ports::archive::ORIGINALS_DIR;

const DEFAULT_INTERVAL_MINUTES: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Holds `tasks/`, `results/`, `originals/` and the lock file.
    pub data_root: PathBuf,
    /// Root that relative asset references resolve against.
    pub media_root: PathBuf,
    pub media_base_url: String,
    /// Product catalog exported by the host.
    pub catalog_path: Option<PathBuf>,
    /// Category for batch submission and single-submission checks.
    pub category: CategoryId,
    pub batch_limit: usize,
    pub lock: LockConfig,
    pub schedule: ScheduleConfig,
    pub style: StyleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("ai_image"),
            media_root: PathBuf::from("uploads"),
            media_base_url: "/uploads".to_string(),
            catalog_path: None,
            category: CategoryId::new(14834),
            batch_limit: 100,
            lock: LockConfig::default(),
            schedule: ScheduleConfig::default(),
            style: StyleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub single_ttl_secs: u64,
    pub batch_ttl_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            single_ttl_secs: 10 * 60,
            batch_ttl_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl ScheduleConfig {
    /// Tick interval; anything below one minute falls back to 15.
    pub fn interval(&self) -> Duration {
        let minutes = if self.interval_minutes < 1 {
            DEFAULT_INTERVAL_MINUTES
        } else {
            self.interval_minutes
        };
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Never below 1.
    pub fn batch_limit(&self) -> usize {
        self.batch_limit.max(1)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.data_root.join(TASKS_DIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_root.join(RESULTS_DIR)
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.data_root.join(ORIGINALS_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_root.join(LOCK_FILE)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            style: self.style.clone(),
            category: self.category,
            single_lock_ttl: Duration::from_secs(self.lock.single_ttl_secs),
            batch_lock_ttl: Duration::from_secs(self.lock.batch_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogoRemovalMethod;
    use rstest::rstest;

    #[test]
    fn empty_document_is_all_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.category, CategoryId::new(14834));
        assert_eq!(config.batch_limit(), 100);
        assert_eq!(config.lock.single_ttl_secs, 600);
        assert_eq!(config.lock.batch_ttl_secs, 1800);
        assert!(!config.schedule.enabled);
        assert_eq!(config.style.width, 620);
        assert_eq!(config.tasks_dir(), PathBuf::from("ai_image/tasks"));
        assert_eq!(config.lock_path(), PathBuf::from("ai_image/processing.lock"));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config: AppConfig = serde_json::from_str(
            r##"{
                "data_root": "/srv/retouch",
                "batch_limit": 0,
                "schedule": {"enabled": true},
                "style": {"logo_removal_method": "lama", "colors": {"cyan": "#00FFFF"}}
            }"##,
        )
        .unwrap();
        assert_eq!(config.results_dir(), PathBuf::from("/srv/retouch/results"));
        assert_eq!(config.batch_limit(), 1);
        assert!(config.schedule.enabled);
        assert_eq!(config.schedule.interval_minutes, 15);
        assert_eq!(config.style.logo_removal_method, LogoRemovalMethod::Learned);
        assert_eq!(config.style.colors.cyan, "#00FFFF");
        assert_eq!(config.style.colors.white, "#FFFFFF");
    }

    #[rstest]
    #[case::zero(0, 15 * 60)]
    #[case::one(1, 60)]
    #[case::default(15, 15 * 60)]
    #[case::huge(u64::MAX, u64::MAX)]
    fn schedule_interval(#[case] minutes: u64, #[case] secs: u64) {
        let schedule = ScheduleConfig {
            enabled: true,
            interval_minutes: minutes,
        };
        assert_eq!(schedule.interval(), Duration::from_secs(secs));
    }

    #[test]
    fn load_reports_path_on_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.json");
        assert!(matches!(
            AppConfig::load(&missing),
            Err(ConfigError::Read { path, .. }) if path == missing
        ));

        let broken = tmp.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        assert!(matches!(
            AppConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));

        assert!(AppConfig::load_or_default(None).is_ok());
    }
}
