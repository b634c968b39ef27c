//! Course catalog: the static definition of courses, assessments and the
//! weekly study template.
//!
//! The catalog is reference data. It is loaded from `catalog.toml` and never
//! written by tracker mutations.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{StudyError, StudyResult};

/// The catalog shipped with the binary and written by `study init`.
pub const DEFAULT_CATALOG: &str = include_str!("catalog.default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub courses: Vec<Course>,
    #[serde(default)]
    pub schedule: Vec<StudyBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub alias: String,
    pub name: String,
    #[serde(default)]
    pub assessments: Vec<AssessmentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDef {
    pub key: String,
    pub name: String,
    /// Absent means the date is still to be announced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Due>,
    /// Time the work is due on each due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// Recurring work (weekly tests and the like) has no single deadline.
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Due {
    Date(NaiveDate),
    Dates(Vec<NaiveDate>),
    /// An exam window.
    Range { from: NaiveDate, to: NaiveDate },
}

impl Due {
    /// The first day something is due.
    pub fn first(&self) -> Option<NaiveDate> {
        match self {
            Due::Date(d) => Some(*d),
            Due::Dates(dates) => dates.iter().min().copied(),
            Due::Range { from, .. } => Some(*from),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Due::Range { .. })
    }
}

impl fmt::Display for Due {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Due::Date(d) => write!(f, "{}", d.format("%d %b %Y")),
            Due::Dates(dates) => {
                let parts: Vec<String> =
                    dates.iter().map(|d| d.format("%d %b").to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
            Due::Range { from, to } => {
                write!(f, "{} to {}", from.format("%d %b"), to.format("%d %b %Y"))
            }
        }
    }
}

/// A wall-clock time written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(pub NaiveTime);

impl TimeOfDay {
    pub fn parse(s: &str) -> StudyResult<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeOfDay)
            .map_err(|_| StudyError::Config(format!("Invalid time '{s}'. Expected HH:MM")))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimeOfDay::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One entry of the weekly study template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyBlock {
    pub day: Weekday,
    pub title: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub description: String,
    /// Course alias or code this block is for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

impl Catalog {
    pub fn from_toml(content: &str) -> StudyResult<Self> {
        let catalog: Catalog = toml::from_str(content)
            .map_err(|e| StudyError::Config(format!("Invalid catalog: {e}")))?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> StudyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StudyError::Config(format!("Could not read catalog {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, falling back to the built-in catalog.
    pub fn load_or_default(path: &Path) -> StudyResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::from_toml(DEFAULT_CATALOG)
        }
    }

    fn check(&self) -> StudyResult<()> {
        let mut names = HashSet::new();
        for course in &self.courses {
            for name in [course.code.to_lowercase(), course.alias.to_lowercase()] {
                if !names.insert(name.clone()) {
                    return Err(StudyError::Config(format!(
                        "Catalog declares '{name}' more than once"
                    )));
                }
            }

            let mut keys = HashSet::new();
            for def in &course.assessments {
                if !keys.insert(def.key.as_str()) {
                    return Err(StudyError::Config(format!(
                        "Course {} declares assessment '{}' more than once",
                        course.code, def.key
                    )));
                }
                if let Some(Due::Range { from, to }) = &def.due {
                    if to < from {
                        return Err(StudyError::Config(format!(
                            "Assessment {}/{} ends before it starts",
                            course.code, def.key
                        )));
                    }
                }
            }
        }

        for block in &self.schedule {
            if block.end <= block.start {
                return Err(StudyError::Config(format!(
                    "Study block '{}' on {} must end after it starts",
                    block.title, block.day
                )));
            }
            let unknown_course = block
                .course
                .as_deref()
                .filter(|course| self.course_for_alias_or_code(course).is_none());
            if let Some(course) = unknown_course {
                return Err(StudyError::Config(format!(
                    "Study block '{}' refers to unknown course '{course}'",
                    block.title
                )));
            }
        }

        Ok(())
    }

    pub fn course(&self, code: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.code == code)
    }

    pub fn course_for_alias_or_code(&self, input: &str) -> Option<&Course> {
        self.courses.iter().find(|c| {
            c.code.eq_ignore_ascii_case(input) || c.alias.eq_ignore_ascii_case(input)
        })
    }

    pub fn assessment(&self, code: &str, key: &str) -> Option<&AssessmentDef> {
        self.course(code)?.assessment(key)
    }

    /// Every (course, assessment) pair in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Course, &AssessmentDef)> {
        self.courses
            .iter()
            .flat_map(|c| c.assessments.iter().map(move |a| (c, a)))
    }
}

impl Course {
    pub fn assessment(&self, key: &str) -> Option<&AssessmentDef> {
        self.assessments.iter().find(|a| a.key == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.assessments.iter().map(|a| a.key.clone()).collect()
    }
}
