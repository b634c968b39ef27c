//! Resolution of user-typed identifiers into canonical catalog entries.
//!
//! Every mutation goes through these functions first, so the tracker only
//! ever stores canonical course codes, assessment keys and statuses.

use tracing::warn;

use crate::catalog::{AssessmentDef, Catalog, Course};
use crate::error::{StudyError, StudyResult};
use crate::status::{STATUS_ALIASES, Status};
use crate::tracker::Score;

/// Hours above this are accepted but flagged.
const SUSPICIOUS_HOURS: f64 = 12.0;
const MAX_HOURS: f64 = 24.0;

/// Resolve a course code or short alias, case-insensitively.
pub fn resolve_course<'a>(catalog: &'a Catalog, input: &str) -> StudyResult<&'a Course> {
    let trimmed = input.trim();
    if !trimmed.is_empty() {
        if let Some(course) = catalog.course_for_alias_or_code(trimmed) {
            return Ok(course);
        }
    }

    let mut valid: Vec<String> = catalog
        .courses
        .iter()
        .flat_map(|c| [c.alias.clone(), c.code.clone()])
        .collect();
    valid.sort();

    Err(StudyError::UnknownCourse {
        input: input.to_string(),
        valid,
    })
}

/// Resolve an assessment within a course.
///
/// Tried in order: exact key, case-insensitive key, 1-based number in
/// declaration order, then a unique case-insensitive prefix.
pub fn resolve_assessment<'a>(course: &'a Course, input: &str) -> StudyResult<&'a AssessmentDef> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();

    if let Some(def) = course.assessment(trimmed) {
        return Ok(def);
    }

    if let Some(def) = course
        .assessments
        .iter()
        .find(|a| a.key.to_lowercase() == lowered)
    {
        return Ok(def);
    }

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let index: usize = trimmed.parse().unwrap_or(0);
        return match index.checked_sub(1).and_then(|i| course.assessments.get(i)) {
            Some(def) => Ok(def),
            None => Err(StudyError::UnknownAssessment {
                course: course.code.clone(),
                input: input.to_string(),
                valid: course
                    .assessments
                    .iter()
                    .enumerate()
                    .map(|(i, a)| format!("{}: {}", i + 1, a.key))
                    .collect(),
            }),
        };
    }

    if !lowered.is_empty() {
        let candidates: Vec<&AssessmentDef> = course
            .assessments
            .iter()
            .filter(|a| a.key.to_lowercase().starts_with(&lowered))
            .collect();

        match candidates.as_slice() {
            [only] => return Ok(only),
            [] => {}
            many => {
                let mut matches: Vec<String> = many.iter().map(|a| a.key.clone()).collect();
                matches.sort();
                return Err(StudyError::AmbiguousKey {
                    course: course.code.clone(),
                    input: input.to_string(),
                    matches,
                });
            }
        }
    }

    let mut valid = course.keys();
    valid.sort();
    Err(StudyError::UnknownAssessment {
        course: course.code.clone(),
        input: input.to_string(),
        valid,
    })
}

/// Resolve a canonical status name or alias.
pub fn resolve_status(input: &str) -> StudyResult<Status> {
    let normalized = input.trim().to_lowercase();

    Status::from_canonical(&normalized)
        .or_else(|| Status::from_alias(&normalized))
        .ok_or_else(|| StudyError::InvalidStatus {
            input: input.to_string(),
            canonical: Status::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            aliases: STATUS_ALIASES.iter().map(|(a, _)| a.to_string()).collect(),
        })
}

/// Parse an hours figure. Must be finite and within a single day.
pub fn resolve_hours(input: &str) -> StudyResult<f64> {
    let invalid = |reason: &str| StudyError::InvalidHours {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let hours: f64 = input
        .trim()
        .parse()
        .map_err(|_| invalid("not a number"))?;

    if !hours.is_finite() {
        return Err(invalid("not a number"));
    }
    if hours < 0.0 {
        return Err(invalid("cannot be negative"));
    }
    if hours > MAX_HOURS {
        return Err(invalid("more than 24 hours in one entry"));
    }
    if hours > SUSPICIOUS_HOURS {
        warn!(hours, "Logging an unusually long study session");
    }

    Ok(hours)
}

/// Parse a score. Numeric text becomes a number; anything else (e.g. "17/20",
/// "A-") is kept as text.
pub fn resolve_score(input: &str) -> StudyResult<Score> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StudyError::InvalidScore("score cannot be empty".into()));
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Score::Number(n)),
        _ => Ok(Score::Text(trimmed.to_string())),
    }
}
