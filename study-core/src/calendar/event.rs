//! Calendar events: what we want in the calendar, what is already there, and
//! the identity key that ties the two together.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Last line of every event this tool creates.
pub const MARKER_PREFIX: &str = "study-tracker-id: ";

/// Title prefixes of events created by earlier versions, which carried no
/// marker line.
pub const LEGACY_PREFIXES: &[&str] = &[
    "DEADLINE:",
    "EXAM:",
    "SUBMITTED:",
    "DONE:",
    "OVERDUE:",
    "Study:",
    "WATCH:",
];

/// Minutes before start for deadline and exam alerts.
pub const DEADLINE_REMINDERS: [u32; 3] = [1440, 120, 30];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Deadline,
    Exam,
    Study,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Deadline => "deadline",
            EventCategory::Exam => "exam",
            EventCategory::Study => "study",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "deadline" => Some(EventCategory::Deadline),
            "exam" => Some(EventCategory::Exam),
            "study" => Some(EventCategory::Study),
            _ => None,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identity of a managed event: what it is for and which day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub category: EventCategory,
    pub course: Option<String>,
    /// Assessment key, or a slug of the study block.
    pub item: String,
    pub date: NaiveDate,
}

impl EventKey {
    pub fn marker(&self) -> String {
        format!("{MARKER_PREFIX}{self}")
    }

    /// Find and parse the marker line in an event description.
    pub fn from_description(description: &str) -> Option<EventKey> {
        let line = description
            .lines()
            .rev()
            .find_map(|l| l.trim().strip_prefix(MARKER_PREFIX))?;

        let mut parts = line.trim().split('/');
        let category = EventCategory::parse(parts.next()?)?;
        let course = match parts.next()? {
            "-" => None,
            code => Some(code.to_string()),
        };
        let item = parts.next()?.to_string();
        let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
        if parts.next().is_some() || item.is_empty() {
            return None;
        }

        Some(EventKey {
            category,
            course,
            item,
            date,
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.category,
            self.course.as_deref().unwrap_or("-"),
            self.item,
            self.date.format("%Y-%m-%d")
        )
    }
}

/// An event the tracker wants in the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub key: EventKey,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Includes the marker line.
    pub description: String,
    pub reminders: Vec<u32>,
}

impl CalendarEvent {
    pub fn new(
        key: EventKey,
        summary: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        body: &str,
    ) -> Self {
        let description = if body.is_empty() {
            key.marker()
        } else {
            format!("{body}\n\n{}", key.marker())
        };
        let reminders = match key.category {
            EventCategory::Deadline | EventCategory::Exam => DEADLINE_REMINDERS.to_vec(),
            EventCategory::Study => Vec::new(),
        };

        CalendarEvent {
            key,
            summary: summary.into(),
            start,
            end,
            description,
            reminders,
        }
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// Calendar-assigned event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event as listed by the external calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub id: EventId,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
    pub reminders: Vec<u32>,
}

impl RemoteEvent {
    pub fn key(&self) -> Option<EventKey> {
        EventKey::from_description(&self.description)
    }

    /// Created by this tool, now or by an earlier version.
    pub fn is_managed(&self) -> bool {
        self.key().is_some() || LEGACY_PREFIXES.iter().any(|p| self.summary.starts_with(p))
    }

    /// Same content as `wanted`; reminder order is ignored.
    pub fn matches(&self, wanted: &CalendarEvent) -> bool {
        let mut ours = self.reminders.clone();
        let mut theirs = wanted.reminders.clone();
        ours.sort_unstable();
        theirs.sort_unstable();

        self.summary == wanted.summary
            && self.start == wanted.start
            && self.end == wanted.end
            && self.description == wanted.description
            && ours == theirs
    }
}

impl fmt::Display for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EventKey {
        EventKey {
            category: EventCategory::Deadline,
            course: Some("ELEC70028".into()),
            item: "core_part_2".into(),
            date: NaiveDate::from_ymd_opt(2026, 12, 11).unwrap(),
        }
    }

    #[test]
    fn test_marker_round_trip() {
        let event = CalendarEvent::new(
            key(),
            "DEADLINE: [pc] Core Coursework: Part 2",
            key().date.and_hms_opt(15, 0, 0).unwrap(),
            key().date.and_hms_opt(16, 0, 0).unwrap(),
            "Predictive Control",
        );

        assert!(event.description.ends_with("deadline/ELEC70028/core_part_2/2026-12-11"));
        assert_eq!(EventKey::from_description(&event.description), Some(key()));
        assert_eq!(event.reminders, vec![1440, 120, 30]);
    }

    #[test]
    fn test_study_events_have_no_reminders() {
        let key = EventKey {
            category: EventCategory::Study,
            course: None,
            item: "review-1200".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
        };
        let start = key.date.and_hms_opt(12, 0, 0).unwrap();
        let event = CalendarEvent::new(key, "Study: Review", start, start, "");
        assert!(event.reminders.is_empty());
        assert!(event.description.starts_with(MARKER_PREFIX));
    }

    #[test]
    fn test_malformed_markers_are_ignored() {
        assert!(EventKey::from_description("study-tracker-id: meeting/x/y/2026-01-01").is_none());
        assert!(EventKey::from_description("study-tracker-id: exam/x/y/not-a-date").is_none());
        assert!(EventKey::from_description("lunch with Sam").is_none());
    }

    #[test]
    fn test_managed_detection() {
        let remote = |summary: &str, description: &str| RemoteEvent {
            id: EventId("1".into()),
            summary: summary.into(),
            start: key().date.and_hms_opt(9, 0, 0).unwrap(),
            end: key().date.and_hms_opt(10, 0, 0).unwrap(),
            description: description.into(),
            reminders: vec![],
        };

        assert!(remote("anything", &key().marker()).is_managed());
        assert!(remote("DEADLINE: [pc] Old", "").is_managed());
        assert!(!remote("Dentist", "bring card").is_managed());
    }

    #[test]
    fn test_keys_order_by_category_then_course() {
        let exam = EventKey {
            category: EventCategory::Exam,
            ..key()
        };
        let other_course = EventKey {
            course: Some("ELEC70073".into()),
            ..key()
        };

        let mut keys = vec![exam.clone(), other_course.clone(), key()];
        keys.sort();
        assert_eq!(keys, vec![key(), other_course, exam]);
    }
}
