//! On-disk persistence of the tracker document.
//!
//! Writes are atomic (temp file + rename) and every overwrite is preceded by
//! a timestamped backup of what was on disk. A lock file keeps two `study`
//! processes from interleaving read-modify-write cycles.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::error::{StudyError, StudyResult};
use crate::tracker::backup::{BackupEntry, Backups};
use crate::tracker::document::TrackerDocument;

pub const TRACKER_FILE: &str = "tracker.json";
pub const LOCK_FILE: &str = "tracker.lock";
pub const BACKUP_DIR: &str = "backups";

pub struct TrackerStore {
    path: PathBuf,
    lock_path: PathBuf,
    backups: Backups,
    max_backups: usize,
}

/// Releases the lock when dropped.
struct LockGuard {
    _file: File,
}

/// Write `bytes` to `path` via a sibling temp file so readers never see a
/// partial document.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StudyResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp = path.with_file_name(temp_name);

    {
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp, path)?;
    Ok(())
}

/// Parse a document and check it against the catalog.
pub(crate) fn parse_document(
    content: &str,
    path: &Path,
    catalog: &Catalog,
) -> StudyResult<TrackerDocument> {
    let doc: TrackerDocument =
        serde_json::from_str(content).map_err(|e| StudyError::CorruptData {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let dangling = doc.dangling_references(catalog);
    if !dangling.is_empty() {
        return Err(StudyError::CorruptData {
            path: path.to_path_buf(),
            reason: format!("unknown assessments {}", dangling.join(", ")),
        });
    }

    Ok(doc)
}

fn to_json(doc: &TrackerDocument) -> StudyResult<String> {
    let mut json =
        serde_json::to_string_pretty(doc).map_err(|e| StudyError::Serialization(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

impl TrackerStore {
    pub fn new(data_dir: &Path, max_backups: usize) -> Self {
        TrackerStore {
            path: data_dir.join(TRACKER_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            backups: Backups::new(data_dir.join(BACKUP_DIR)),
            max_backups,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &Backups {
        &self.backups
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn lock(&self) -> StudyResult<LockGuard> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| StudyError::Locked(self.lock_path.clone()))?;
        Ok(LockGuard { _file: file })
    }

    pub fn load(&self, catalog: &Catalog) -> StudyResult<TrackerDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StudyError::DataNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let doc = parse_document(&content, &self.path, catalog)?;
        debug!(path = %self.path.display(), "Loaded tracker");
        Ok(doc)
    }

    /// Back up whatever is on disk, then atomically replace it with `doc`.
    pub fn save(&self, doc: &TrackerDocument, clock: &dyn Clock) -> StudyResult<()> {
        let _guard = self.lock()?;
        self.write_locked(doc, clock)
    }

    fn write_locked(&self, doc: &TrackerDocument, clock: &dyn Clock) -> StudyResult<()> {
        let json = to_json(doc)?;

        let backup = self.backups.create(&self.path, clock.now())?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), "Saved tracker");

        // Prune last, so a failed write never costs an older backup.
        if backup.is_some() {
            if let Err(e) = self.backups.prune(self.max_backups) {
                warn!(error = %e, "Could not prune old backups");
            }
        }

        Ok(())
    }

    /// Write a fresh document seeded from the catalog. Returns false when a
    /// tracker already exists.
    pub fn init(&self, catalog: &Catalog, clock: &dyn Clock) -> StudyResult<bool> {
        let _guard = self.lock()?;
        if self.exists() {
            return Ok(false);
        }

        let doc = TrackerDocument::from_catalog(catalog, clock.now());
        write_atomic(&self.path, to_json(&doc)?.as_bytes())?;
        info!(path = %self.path.display(), "Created tracker");
        Ok(true)
    }

    /// Locked read-modify-write. `f` sees the current document; if it fails
    /// nothing is written.
    pub fn modify<T>(
        &self,
        catalog: &Catalog,
        clock: &dyn Clock,
        f: impl FnOnce(&mut TrackerDocument) -> StudyResult<T>,
    ) -> StudyResult<T> {
        let _guard = self.lock()?;
        let mut doc = self.load(catalog)?;
        let result = f(&mut doc)?;
        self.write_locked(&doc, clock)?;
        Ok(result)
    }

    /// Replace the tracker with a backup. The backup must be a valid
    /// document, and the current file is itself backed up first.
    pub fn restore(
        &self,
        catalog: &Catalog,
        name: &str,
        clock: &dyn Clock,
    ) -> StudyResult<BackupEntry> {
        let _guard = self.lock()?;
        let entry = self.backups.find(name)?;

        let content = fs::read_to_string(&entry.path)?;
        let doc = parse_document(&content, &entry.path, catalog)?;

        self.write_locked(&doc, clock)?;
        info!(backup = %entry.name, "Restored tracker from backup");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATALOG;
    use crate::clock::FixedClock;
    use crate::status::Status;
    use crate::tracker::document::FieldValue;
    use chrono::Duration;

    fn setup() -> (tempfile::TempDir, Catalog, FixedClock, TrackerStore) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::from_toml(DEFAULT_CATALOG).unwrap();
        let clock = FixedClock::at("2026-10-17T10:00:00");
        let store = TrackerStore::new(dir.path(), 3);
        (dir, catalog, clock, store)
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, catalog, _clock, store) = setup();
        assert!(matches!(
            store.load(&catalog),
            Err(StudyError::DataNotFound(_))
        ));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let (_dir, catalog, _clock, store) = setup();
        fs::write(store.path(), "{ \"courses\": ").unwrap();
        assert!(matches!(
            store.load(&catalog),
            Err(StudyError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_load_rejects_missing_required_fields() {
        let (_dir, catalog, _clock, store) = setup();
        fs::write(store.path(), r#"{ "courses": {} }"#).unwrap();
        let err = store.load(&catalog).unwrap_err();
        assert!(
            matches!(&err, StudyError::CorruptData { reason, .. } if reason.contains("total_hours")),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_load_rejects_unknown_assessment() {
        let (_dir, catalog, _clock, store) = setup();
        fs::write(
            store.path(),
            r#"{
                "courses": { "ELEC70028": { "mystery": {
                    "status": "completed", "last_updated": "2026-10-01T09:00:00"
                } } },
                "total_hours": 0.0
            }"#,
        )
        .unwrap();

        let err = store.load(&catalog).unwrap_err();
        assert!(
            matches!(&err, StudyError::CorruptData { reason, .. } if reason.contains("ELEC70028/mystery")),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();

        let doc = store.load(&catalog).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();
        store.save(&doc, &clock).unwrap();
        let after = fs::read_to_string(store.path()).unwrap();

        assert_eq!(before, after, "Saving an unchanged document must not alter it");
        assert_eq!(store.load(&catalog).unwrap(), doc);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let (_dir, catalog, clock, store) = setup();
        assert!(store.init(&catalog, &clock).unwrap());
        assert!(!store.init(&catalog, &clock).unwrap());
        assert!(store.backups().list().unwrap().is_empty());
    }

    #[test]
    fn test_every_save_backs_up_and_prunes_to_cap() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();

        for _ in 0..5 {
            clock.advance(Duration::seconds(1));
            store
                .modify(&catalog, &clock, |doc| {
                    doc.log_hours(&catalog, 1.0, None, None, clock.now())
                })
                .unwrap();
        }

        let backups = store.backups().list().unwrap();
        assert_eq!(backups.len(), 3, "Only max_backups backups are kept");
        assert_eq!(backups[0].name, "tracker_20261017_100005.json");
        assert_eq!(backups[2].name, "tracker_20261017_100003.json");
        assert_eq!(store.load(&catalog).unwrap().total_hours, 5.0);
    }

    #[test]
    fn test_backups_in_same_second_do_not_collide() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();

        for _ in 0..2 {
            store
                .modify(&catalog, &clock, |doc| {
                    doc.log_hours(&catalog, 1.0, None, None, clock.now())
                })
                .unwrap();
        }

        let names: Vec<String> = store
            .backups()
            .list()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(
            names,
            vec!["tracker_20261017_100000_2.json", "tracker_20261017_100000.json"]
        );
    }

    #[test]
    fn test_failed_modify_writes_nothing() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result = store.modify(&catalog, &clock, |doc| {
            doc.update_assessment(
                &catalog,
                "ELEC70028",
                "nope",
                FieldValue::Status(Status::Completed),
                clock.now(),
            )
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert!(store.backups().list().unwrap().is_empty());
    }

    #[test]
    fn test_restore_round_trips_backup() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();

        clock.advance(Duration::seconds(1));
        store
            .modify(&catalog, &clock, |doc| {
                doc.update_assessment(
                    &catalog,
                    "ELEC70028",
                    "core_part_2",
                    FieldValue::Status(Status::Submitted),
                    clock.now(),
                )
            })
            .unwrap();

        // The only backup holds the pre-submission document.
        let backup = store.backups().list().unwrap().remove(0);
        clock.advance(Duration::seconds(1));
        store.restore(&catalog, &backup.name, &clock).unwrap();

        let doc = store.load(&catalog).unwrap();
        assert_eq!(
            doc.state("ELEC70028", "core_part_2").unwrap().status,
            Status::NotStarted
        );
        assert_eq!(
            store.backups().list().unwrap().len(),
            2,
            "Restoring backs up the file it replaces"
        );
    }

    #[test]
    fn test_restore_rejects_corrupt_backup() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();
        fs::create_dir_all(store.backups().dir()).unwrap();
        fs::write(
            store.backups().dir().join("tracker_20261001_090000.json"),
            "garbage",
        )
        .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let err = store
            .restore(&catalog, "tracker_20261001_090000", &clock)
            .unwrap_err();
        assert!(matches!(err, StudyError::CorruptData { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let (_dir, catalog, clock, store) = setup();
        store.init(&catalog, &clock).unwrap();

        let _held = store.lock().unwrap();
        let other = TrackerStore::new(store.path().parent().unwrap(), 3);
        assert!(matches!(
            other.save(&TrackerDocument::from_catalog(&catalog, clock.now()), &clock),
            Err(StudyError::Locked(_))
        ));
    }
}
