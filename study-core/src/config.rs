//! User configuration at ~/.config/study/config.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{StudyError, StudyResult};

static DEFAULT_DATA_DIR: &str = "~/study";
static DEFAULT_CALENDAR_NAME: &str = "Study Schedule";
const DEFAULT_MAX_BACKUPS: usize = 10;
const DEFAULT_SYNC_WEEKS: u32 = 10;
static DEFAULT_CALENDAR_TIMEOUT: &str = "60s";
const DEFAULT_CALENDAR_RETRIES: u32 = 3;

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_calendar_name() -> String {
    DEFAULT_CALENDAR_NAME.to_string()
}

fn default_max_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}

fn default_sync_weeks() -> u32 {
    DEFAULT_SYNC_WEEKS
}

fn default_calendar_timeout() -> String {
    DEFAULT_CALENDAR_TIMEOUT.to_string()
}

fn default_calendar_retries() -> u32 {
    DEFAULT_CALENDAR_RETRIES
}

/// Settings read from the config file, overridable with `STUDY_*`
/// environment variables (e.g. `STUDY_DATA_DIR`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,

    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    #[serde(default = "default_sync_weeks")]
    pub sync_weeks: u32,

    /// Per-call limit for calendar operations, e.g. "60s" or "2m".
    #[serde(default = "default_calendar_timeout")]
    pub calendar_timeout: String,

    #[serde(default = "default_calendar_retries")]
    pub calendar_retries: u32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        StudyConfig {
            data_dir: default_data_dir(),
            calendar_name: default_calendar_name(),
            max_backups: default_max_backups(),
            sync_weeks: default_sync_weeks(),
            calendar_timeout: default_calendar_timeout(),
            calendar_retries: default_calendar_retries(),
        }
    }
}

impl StudyConfig {
    pub fn config_path() -> StudyResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StudyError::Config("Could not determine config directory".into()))?
            .join("study");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template on
    /// first run.
    pub fn load() -> StudyResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> StudyResult<Self> {
        let config: StudyConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("STUDY").try_parsing(true))
            .build()
            .map_err(|e| StudyError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| StudyError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> StudyResult<()> {
        if self.max_backups == 0 {
            return Err(StudyError::Config("max_backups must be at least 1".into()));
        }
        if self.sync_weeks == 0 {
            return Err(StudyError::Config("sync_weeks must be at least 1".into()));
        }
        if self.calendar_name.trim().is_empty() {
            return Err(StudyError::Config("calendar_name cannot be empty".into()));
        }
        self.calendar_timeout()?;
        Ok(())
    }

    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    pub fn calendar_timeout(&self) -> StudyResult<Duration> {
        humantime::parse_duration(&self.calendar_timeout).map_err(|e| {
            StudyError::Config(format!(
                "Invalid calendar_timeout '{}': {e}",
                self.calendar_timeout
            ))
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> StudyResult<()> {
        let contents = format!(
            "\
# study configuration

# Where tracker.json, catalog.toml and backups/ live:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Calendar that deadlines and study blocks are synced into:
# calendar_name = \"{DEFAULT_CALENDAR_NAME}\"

# Backups kept before the oldest are deleted:
# max_backups = {DEFAULT_MAX_BACKUPS}

# Weeks of calendar to keep in sync, starting this Monday:
# sync_weeks = {DEFAULT_SYNC_WEEKS}

# Time limit and attempts for each calendar call:
# calendar_timeout = \"{DEFAULT_CALENDAR_TIMEOUT}\"
# calendar_retries = {DEFAULT_CALENDAR_RETRIES}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StudyError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| StudyError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        StudyConfig::create_default_config(&path).unwrap();

        let config = StudyConfig::load_from(&path).unwrap();
        assert_eq!(config.calendar_name, "Study Schedule");
        assert_eq!(config.max_backups, 10);
        assert_eq!(config.sync_weeks, 10);
        assert_eq!(config.calendar_timeout().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "calendar_name = \"Uni\"\nmax_backups = 3\ncalendar_timeout = \"2m\"\n",
        )
        .unwrap();

        let config = StudyConfig::load_from(&path).unwrap();
        assert_eq!(config.calendar_name, "Uni");
        assert_eq!(config.max_backups, 3);
        assert_eq!(config.calendar_timeout().unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_rejects_zero_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_backups = 0\n").unwrap();
        assert!(matches!(
            StudyConfig::load_from(&path),
            Err(StudyError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "calendar_timeout = \"soon\"\n").unwrap();
        assert!(StudyConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_data_path_expands_tilde() {
        let config = StudyConfig::default();
        assert!(!config.data_path().to_string_lossy().starts_with('~'));
    }
}
