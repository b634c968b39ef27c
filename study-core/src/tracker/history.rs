//! Change history, used to undo recent mutations.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::error::{StudyError, StudyResult};
use crate::tracker::document::FieldValue;
use crate::tracker::store::{TrackerStore, write_atomic};

/// Entries kept before the oldest fall off.
pub const MAX_HISTORY: usize = 50;

/// One reversible edit to the tracker document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Field {
        course: String,
        key: String,
        old: Option<FieldValue>,
        new: FieldValue,
    },
    Hours {
        week: String,
        course: Option<String>,
        assessment: Option<String>,
        added: f64,
    },
}

/// Everything one command changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub changes: Vec<Change>,
}

pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        History { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Oldest first. An unreadable history is treated as empty.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable history");
                Vec::new()
            }
        }
    }

    fn write(&self, entries: &[HistoryEntry]) -> StudyResult<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StudyError::Serialization(e.to_string()))?;
        write_atomic(&self.path, content.as_bytes())
    }

    pub fn record(&self, entry: HistoryEntry) -> StudyResult<()> {
        if entry.changes.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries();
        entries.push(entry);
        if entries.len() > MAX_HISTORY {
            let excess = entries.len() - MAX_HISTORY;
            entries.drain(..excess);
        }
        self.write(&entries)
    }

    /// Most recent `n`, newest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries().into_iter().rev().take(n).collect()
    }

    /// Revert the newest entry through the store, so the undo itself is
    /// backed up like any other write. Returns the entry that was undone.
    ///
    /// The entry leaves the history before the tracker is touched, and goes
    /// back if the revert fails. A change is never reverted twice.
    pub fn undo(
        &self,
        store: &TrackerStore,
        catalog: &Catalog,
        clock: &dyn Clock,
    ) -> StudyResult<Option<HistoryEntry>> {
        let mut entries = self.entries();
        let Some(entry) = entries.pop() else {
            return Ok(None);
        };
        self.write(&entries)?;

        let now = clock.now();
        let reverted = store.modify(catalog, clock, |doc| {
            for change in entry.changes.iter().rev() {
                doc.revert(catalog, change, now)?;
            }
            Ok(())
        });

        if let Err(e) = reverted {
            entries.push(entry);
            if let Err(write_err) = self.write(&entries) {
                warn!(error = %write_err, "Could not put the undo entry back");
            }
            return Err(e);
        }
        Ok(Some(entry))
    }
}

impl HistoryEntry {
    pub fn new(timestamp: NaiveDateTime, description: impl Into<String>, changes: Vec<Change>) -> Self {
        HistoryEntry {
            timestamp,
            description: description.into(),
            changes,
        }
    }
}
