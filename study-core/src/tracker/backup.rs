//! Timestamped tracker backups.
//!
//! Backups are named `tracker_YYYYMMDD_HHMMSS.json`, with a `_N` suffix when
//! more than one is taken in the same second. Ordering always comes from the
//! name, never from file metadata.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::error::{StudyError, StudyResult};
use crate::tracker::store::write_atomic;

const PREFIX: &str = "tracker_";
const EXTENSION: &str = ".json";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
    pub seq: u32,
    pub size: u64,
}

pub struct Backups {
    dir: PathBuf,
}

/// Split a backup file name into its timestamp and same-second sequence.
fn parse_name(name: &str) -> Option<(NaiveDateTime, u32)> {
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
    // YYYYMMDD_HHMMSS is 15 characters.
    if stem.len() < 15 || !stem.is_char_boundary(15) {
        return None;
    }
    let (stamp, rest) = stem.split_at(15);
    let taken_at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;

    let seq = match rest {
        "" => 1,
        _ => rest.strip_prefix('_')?.parse().ok().filter(|n| *n >= 2)?,
    };
    Some((taken_at, seq))
}

fn file_name(taken_at: NaiveDateTime, seq: u32) -> String {
    let stamp = taken_at.format(STAMP_FORMAT);
    if seq <= 1 {
        format!("{PREFIX}{stamp}{EXTENSION}")
    } else {
        format!("{PREFIX}{stamp}_{seq}{EXTENSION}")
    }
}

impl Backups {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Backups { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into a new backup. Returns `None` when there is nothing
    /// on disk to back up yet.
    pub fn create(&self, source: &Path, now: NaiveDateTime) -> StudyResult<Option<BackupEntry>> {
        let content = match fs::read(source) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        fs::create_dir_all(&self.dir)?;

        // Names only carry whole seconds, and never go backwards: when the
        // wall clock repeats an hour the stamp stays at the newest backup and
        // the sequence suffix orders them.
        let mut taken_at = now.with_nanosecond(0).unwrap_or(now);
        if let Some(newest) = self.list()?.first() {
            if newest.taken_at > taken_at {
                warn!(backup = %newest.name, "Clock is behind the newest backup");
                taken_at = newest.taken_at;
            }
        }
        let mut seq = 1;
        let mut path = self.dir.join(file_name(taken_at, seq));
        while path.exists() {
            seq += 1;
            path = self.dir.join(file_name(taken_at, seq));
        }

        write_atomic(&path, &content)?;
        let name = file_name(taken_at, seq);
        debug!(backup = %name, "Created backup");

        Ok(Some(BackupEntry {
            name,
            path,
            taken_at,
            seq,
            size: content.len() as u64,
        }))
    }

    /// All backups, newest first.
    pub fn list(&self) -> StudyResult<Vec<BackupEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups: Vec<BackupEntry> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let (taken_at, seq) = parse_name(&name)?;
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                Some(BackupEntry {
                    name,
                    path: entry.path(),
                    taken_at,
                    seq,
                    size,
                })
            })
            .collect();

        backups.sort_by(|a, b| (b.taken_at, b.seq).cmp(&(a.taken_at, a.seq)));
        Ok(backups)
    }

    /// Delete the oldest backups beyond `cap`. Returns the names removed.
    pub fn prune(&self, cap: usize) -> StudyResult<Vec<String>> {
        let backups = self.list()?;
        let mut removed = Vec::new();

        for old in backups.into_iter().skip(cap) {
            fs::remove_file(&old.path)?;
            removed.push(old.name);
        }

        if !removed.is_empty() {
            info!(count = removed.len(), cap, "Pruned old backups");
        }
        Ok(removed)
    }

    /// Look a backup up by file name, with or without the extension.
    pub fn find(&self, name: &str) -> StudyResult<BackupEntry> {
        let wanted = if name.ends_with(EXTENSION) {
            name.to_string()
        } else {
            format!("{name}{EXTENSION}")
        };

        let backups = self.list()?;
        let available: Vec<String> = backups.iter().map(|b| b.name.clone()).collect();

        backups
            .into_iter()
            .find(|b| b.name == wanted)
            .ok_or_else(|| StudyError::BackupNotFound {
                name: name.to_string(),
                available,
            })
    }
}
