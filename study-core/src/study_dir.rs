//! The study data directory: resolved config plus the paths and handles
//! built from it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::calendar::RetryPolicy;
use crate::catalog::{Catalog, DEFAULT_CATALOG};
use crate::clock::Clock;
use crate::config::StudyConfig;
use crate::date_range::DateRange;
use crate::error::StudyResult;
use crate::tracker::{History, TrackerStore};

pub const CATALOG_FILE: &str = "catalog.toml";
pub const HISTORY_FILE: &str = "history.json";

/// What `init` created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOutcome {
    pub catalog_written: bool,
    pub tracker_written: bool,
}

#[derive(Clone)]
pub struct StudyDir {
    config: StudyConfig,
    data_path: PathBuf,
}

impl StudyDir {
    /// Load config from disk and the environment. `data_dir` wins over both.
    pub fn load(data_dir: Option<PathBuf>) -> StudyResult<Self> {
        let config = StudyConfig::load()?;
        Ok(Self::with_config(config, data_dir))
    }

    pub fn with_config(config: StudyConfig, data_dir: Option<PathBuf>) -> Self {
        let data_path = match data_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned()),
            None => config.data_path(),
        };
        StudyDir { config, data_path }
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_path.join(CATALOG_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_path.join(HISTORY_FILE)
    }

    /// `catalog.toml` if present, otherwise the built-in catalog.
    pub fn catalog(&self) -> StudyResult<Catalog> {
        Catalog::load_or_default(&self.catalog_path())
    }

    pub fn store(&self) -> TrackerStore {
        TrackerStore::new(&self.data_path, self.config.max_backups)
    }

    pub fn history(&self) -> History {
        History::new(self.history_path())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.calendar_retries.max(1),
            ..RetryPolicy::default()
        }
    }

    pub fn sync_window(&self, today: NaiveDate) -> DateRange {
        DateRange::sync_window(today, self.config.sync_weeks)
    }

    /// Write the default catalog and a fresh tracker, leaving existing files
    /// alone.
    pub fn init(&self, clock: &dyn Clock) -> StudyResult<InitOutcome> {
        std::fs::create_dir_all(&self.data_path)?;

        let catalog_path = self.catalog_path();
        let catalog_written = !catalog_path.exists();
        if catalog_written {
            std::fs::write(&catalog_path, DEFAULT_CATALOG)?;
        }

        let catalog = self.catalog()?;
        let tracker_written = self.store().init(&catalog, clock)?;

        Ok(InitOutcome {
            catalog_written,
            tracker_written,
        })
    }
}
