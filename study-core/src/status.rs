//! Assessment progress statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    InProgress,
    Completed,
    Submitted,
    Overdue,
    Ongoing,
}

/// Shorthands accepted wherever a status is typed.
pub const STATUS_ALIASES: &[(&str, Status)] = &[
    ("done", Status::Completed),
    ("finish", Status::Completed),
    ("finished", Status::Completed),
    ("complete", Status::Completed),
    ("submit", Status::Submitted),
    ("sent", Status::Submitted),
    ("turned_in", Status::Submitted),
    ("started", Status::InProgress),
    ("working", Status::InProgress),
    ("wip", Status::InProgress),
    ("inprogress", Status::InProgress),
    ("in-progress", Status::InProgress),
    ("todo", Status::NotStarted),
    ("pending", Status::NotStarted),
    ("notstarted", Status::NotStarted),
    ("not-started", Status::NotStarted),
    ("late", Status::Overdue),
    ("missed", Status::Overdue),
];

impl Status {
    pub const ALL: [Status; 6] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Completed,
        Status::Submitted,
        Status::Overdue,
        Status::Ongoing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Submitted => "submitted",
            Status::Overdue => "overdue",
            Status::Ongoing => "ongoing",
        }
    }

    pub fn from_canonical(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn from_alias(s: &str) -> Option<Status> {
        STATUS_ALIASES
            .iter()
            .find(|(alias, _)| *alias == s)
            .map(|(_, status)| *status)
    }

    /// Completed or submitted: nothing left to do.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Completed | Status::Submitted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
