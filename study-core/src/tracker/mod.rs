//! Persistent progress state: the tracker document, its store, backups and
//! change history.

mod backup;
mod document;
mod history;
mod store;

pub use backup::{BackupEntry, Backups};
pub use document::{
    AssessmentState, Field, FieldValue, Score, TrackerDocument, WeekLog, week_key, week_start,
};
pub use history::{Change, History, HistoryEntry, MAX_HISTORY};
pub use store::{BACKUP_DIR, LOCK_FILE, TRACKER_FILE, TrackerStore};
