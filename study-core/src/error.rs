//! Error types for the study tracker.

use std::path::PathBuf;

use thiserror::Error;

/// How many valid options a hint lists before truncating.
const HINT_OPTIONS: usize = 10;

/// Errors that can occur in tracker and calendar operations.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Unknown course: '{input}'")]
    UnknownCourse { input: String, valid: Vec<String> },

    #[error("Unknown assessment '{input}' for {course}")]
    UnknownAssessment {
        course: String,
        input: String,
        valid: Vec<String>,
    },

    #[error("Ambiguous assessment '{input}' for {course}: matches {}", matches.join(", "))]
    AmbiguousKey {
        course: String,
        input: String,
        matches: Vec<String>,
    },

    #[error("Invalid status: '{input}'")]
    InvalidStatus {
        input: String,
        canonical: Vec<String>,
        aliases: Vec<String>,
    },

    #[error("Invalid hours '{input}': {reason}")]
    InvalidHours { input: String, reason: String },

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Tracker data at {path} is corrupt: {reason}")]
    CorruptData { path: PathBuf, reason: String },

    #[error("Tracker data not found at {0}")]
    DataNotFound(PathBuf),

    #[error("Backup '{name}' not found")]
    BackupNotFound { name: String, available: Vec<String> },

    #[error("Tracker is locked by another process ({0})")]
    Locked(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar unavailable: {0}")]
    CalendarUnavailable(String),

    #[error("Calendar request timed out after {0}s")]
    CalendarTimeout(u64),

    #[error("Calendar rejected '{summary}': {reason}")]
    CalendarEvent { summary: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StudyError {
    /// Stable class name printed alongside the message.
    pub fn class(&self) -> &'static str {
        match self {
            StudyError::UnknownCourse { .. } => "UnknownCourseError",
            StudyError::UnknownAssessment { .. } => "UnknownAssessmentError",
            StudyError::AmbiguousKey { .. } => "AmbiguousKeyError",
            StudyError::InvalidStatus { .. } => "InvalidStatusError",
            StudyError::InvalidHours { .. } => "InvalidHoursError",
            StudyError::InvalidScore(_) => "InvalidScoreError",
            StudyError::CorruptData { .. } => "CorruptDataError",
            StudyError::DataNotFound(_) => "DataNotFoundError",
            StudyError::BackupNotFound { .. } => "BackupNotFoundError",
            StudyError::Locked(_) => "LockedError",
            StudyError::Config(_) => "ConfigError",
            StudyError::CalendarUnavailable(_) => "CalendarUnavailableError",
            StudyError::CalendarTimeout(_) => "CalendarTimeoutError",
            StudyError::CalendarEvent { .. } => "CalendarEventError",
            StudyError::Io(_) => "IoError",
            StudyError::Serialization(_) => "SerializationError",
        }
    }

    /// A remediation line for the user, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            StudyError::UnknownCourse { valid, .. } => Some(valid_options(valid)),
            StudyError::UnknownAssessment { valid, .. } => Some(valid_options(valid)),
            StudyError::AmbiguousKey { matches, .. } => {
                Some(format!("Be more specific. Candidates: {}", matches.join(", ")))
            }
            StudyError::InvalidStatus {
                canonical, aliases, ..
            } => Some(format!(
                "Valid statuses: {}. Aliases: {}",
                canonical.join(", "),
                aliases.join(", ")
            )),
            StudyError::InvalidHours { .. } => Some("Hours must be a number between 0 and 24".into()),
            StudyError::DataNotFound(_) => Some("Run `study init` to create a tracker".into()),
            StudyError::BackupNotFound { available, .. } if available.is_empty() => {
                Some("No backups exist yet".into())
            }
            StudyError::BackupNotFound { available, .. } => Some(valid_options(available)),
            StudyError::CorruptData { .. } => {
                Some("Restore a known-good copy with `study restore <backup>`".into())
            }
            StudyError::Locked(path) => Some(format!(
                "If no other study command is running, remove {}",
                path.display()
            )),
            _ => None,
        }
    }

    /// True for errors caused by what the user typed.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            StudyError::UnknownCourse { .. }
                | StudyError::UnknownAssessment { .. }
                | StudyError::AmbiguousKey { .. }
                | StudyError::InvalidStatus { .. }
                | StudyError::InvalidHours { .. }
                | StudyError::InvalidScore(_)
                | StudyError::BackupNotFound { .. }
        )
    }

    /// True for calendar failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StudyError::CalendarTimeout(_) | StudyError::CalendarUnavailable(_)
        )
    }
}

fn valid_options(options: &[String]) -> String {
    let shown: Vec<&str> = options.iter().take(HINT_OPTIONS).map(String::as_str).collect();
    if options.len() > HINT_OPTIONS {
        format!(
            "Valid options: {}, ... ({} more)",
            shown.join(", "),
            options.len() - HINT_OPTIONS
        )
    } else {
        format!("Valid options: {}", shown.join(", "))
    }
}

/// Result type alias for tracker operations.
pub type StudyResult<T> = Result<T, StudyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_truncates_long_option_lists() {
        let valid: Vec<String> = (1..=12).map(|i| format!("opt{i}")).collect();
        let err = StudyError::UnknownCourse {
            input: "x".into(),
            valid,
        };

        let hint = err.hint().unwrap();
        assert!(hint.contains("opt10"));
        assert!(!hint.contains("opt11"), "Only the first ten options should be listed");
        assert!(hint.ends_with("(2 more)"));
    }

    #[test]
    fn test_validation_errors_are_user_input() {
        let err = StudyError::InvalidStatus {
            input: "x".into(),
            canonical: vec![],
            aliases: vec![],
        };
        assert!(err.is_user_input());
        assert!(!StudyError::CalendarTimeout(60).is_user_input());
    }

    #[test]
    fn test_only_calendar_transport_errors_retry() {
        assert!(StudyError::CalendarTimeout(60).is_retryable());
        assert!(StudyError::CalendarUnavailable("down".into()).is_retryable());
        let rejected = StudyError::CalendarEvent {
            summary: "x".into(),
            reason: "bad date".into(),
        };
        assert!(!rejected.is_retryable());
    }
}
