//! The persisted tracker document and the mutations allowed on it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{StudyError, StudyResult};
use crate::status::Status;
use crate::tracker::history::Change;

/// Mutable per-user progress state, keyed by course code then assessment key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerDocument {
    pub courses: BTreeMap<String, BTreeMap<String, AssessmentState>>,
    pub total_hours: f64,
    /// Study hours per ISO week (`2026-W42`).
    #[serde(default)]
    pub weekly_log: BTreeMap<String, WeekLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentState {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_logged: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_topic: Option<String>,
    pub last_updated: NaiveDateTime,
    /// Fields written by other tools. Kept so a save never drops them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekLog {
    pub week_of: NaiveDate,
    pub study_hours: f64,
    #[serde(default)]
    pub hours_by_course: BTreeMap<String, f64>,
}

/// A score as entered: a number, or free text like "17/20".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Number(f64),
    Text(String),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Number(n) if n.fract() == 0.0 => write!(f, "{n:.0}"),
            Score::Number(n) => write!(f, "{n}"),
            Score::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Status,
    Score,
    HoursLogged,
    Partner,
    PaperTopic,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Status => "status",
            Field::Score => "score",
            Field::HoursLogged => "hours",
            Field::Partner => "partner",
            Field::PaperTopic => "paper",
        };
        write!(f, "{name}")
    }
}

/// A new value for one assessment field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Status(Status),
    Score(Score),
    HoursLogged(f64),
    Partner(String),
    PaperTopic(String),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Status(_) => Field::Status,
            FieldValue::Score(_) => Field::Score,
            FieldValue::HoursLogged(_) => Field::HoursLogged,
            FieldValue::Partner(_) => Field::Partner,
            FieldValue::PaperTopic(_) => Field::PaperTopic,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Status(s) => write!(f, "{s}"),
            FieldValue::Score(s) => write!(f, "{s}"),
            FieldValue::HoursLogged(h) => write!(f, "{h}h"),
            FieldValue::Partner(p) | FieldValue::PaperTopic(p) => write!(f, "{p}"),
        }
    }
}

impl AssessmentState {
    pub fn new(status: Status, now: NaiveDateTime) -> Self {
        AssessmentState {
            status,
            score: None,
            hours_logged: None,
            partner: None,
            paper_topic: None,
            last_updated: now,
            extra: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Status => Some(FieldValue::Status(self.status)),
            Field::Score => self.score.clone().map(FieldValue::Score),
            Field::HoursLogged => self.hours_logged.map(FieldValue::HoursLogged),
            Field::Partner => self.partner.clone().map(FieldValue::Partner),
            Field::PaperTopic => self.paper_topic.clone().map(FieldValue::PaperTopic),
        }
    }

    /// Write `value` into `field`. `None` clears optional fields; status
    /// cannot be cleared and is left alone.
    fn put(&mut self, field: Field, value: Option<FieldValue>) {
        match (field, value) {
            (Field::Status, Some(FieldValue::Status(s))) => self.status = s,
            (Field::Status, _) => {}
            (Field::Score, Some(FieldValue::Score(s))) => self.score = Some(s),
            (Field::Score, _) => self.score = None,
            (Field::HoursLogged, Some(FieldValue::HoursLogged(h))) => self.hours_logged = Some(h),
            (Field::HoursLogged, _) => self.hours_logged = None,
            (Field::Partner, Some(FieldValue::Partner(p))) => self.partner = Some(p),
            (Field::Partner, _) => self.partner = None,
            (Field::PaperTopic, Some(FieldValue::PaperTopic(p))) => self.paper_topic = Some(p),
            (Field::PaperTopic, _) => self.paper_topic = None,
        }
    }
}

/// ISO week key, e.g. `2026-W42`.
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn round_hours(h: f64) -> f64 {
    (h * 100.0).round() / 100.0
}

impl TrackerDocument {
    /// A fresh document with one state per catalog assessment.
    pub fn from_catalog(catalog: &Catalog, now: NaiveDateTime) -> Self {
        let mut courses: BTreeMap<String, BTreeMap<String, AssessmentState>> = BTreeMap::new();
        for (course, def) in catalog.pairs() {
            let status = if def.recurring {
                Status::Ongoing
            } else {
                Status::NotStarted
            };
            courses
                .entry(course.code.clone())
                .or_default()
                .insert(def.key.clone(), AssessmentState::new(status, now));
        }

        TrackerDocument {
            courses,
            total_hours: 0.0,
            weekly_log: BTreeMap::new(),
        }
    }

    /// Every state must point at a catalog assessment. Returns the offending
    /// `code/key` pairs.
    pub fn dangling_references(&self, catalog: &Catalog) -> Vec<String> {
        let mut dangling = Vec::new();
        for (code, states) in &self.courses {
            for key in states.keys() {
                if catalog.assessment(code, key).is_none() {
                    dangling.push(format!("{code}/{key}"));
                }
            }
        }
        dangling
    }

    pub fn state(&self, code: &str, key: &str) -> Option<&AssessmentState> {
        self.courses.get(code)?.get(key)
    }

    /// Mutable state for a catalog pair, created on first touch.
    fn state_mut(
        &mut self,
        catalog: &Catalog,
        code: &str,
        key: &str,
        now: NaiveDateTime,
    ) -> StudyResult<&mut AssessmentState> {
        let course = catalog.course(code).ok_or_else(|| StudyError::UnknownCourse {
            input: code.to_string(),
            valid: catalog.courses.iter().map(|c| c.code.clone()).collect(),
        })?;
        let def = course
            .assessment(key)
            .ok_or_else(|| StudyError::UnknownAssessment {
                course: code.to_string(),
                input: key.to_string(),
                valid: course.keys(),
            })?;

        let initial = if def.recurring {
            Status::Ongoing
        } else {
            Status::NotStarted
        };

        Ok(self
            .courses
            .entry(code.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| AssessmentState::new(initial, now)))
    }

    /// Set one field of a catalog assessment and stamp `last_updated`.
    pub fn update_assessment(
        &mut self,
        catalog: &Catalog,
        code: &str,
        key: &str,
        value: FieldValue,
        now: NaiveDateTime,
    ) -> StudyResult<Change> {
        let state = self.state_mut(catalog, code, key, now)?;
        let old = state.get(value.field());
        state.put(value.field(), Some(value.clone()));
        state.last_updated = now;

        Ok(Change::Field {
            course: code.to_string(),
            key: key.to_string(),
            old,
            new: value,
        })
    }

    /// Put back a previous field value (undo).
    pub fn restore_field(
        &mut self,
        catalog: &Catalog,
        code: &str,
        key: &str,
        field: Field,
        old: Option<FieldValue>,
        now: NaiveDateTime,
    ) -> StudyResult<()> {
        let state = self.state_mut(catalog, code, key, now)?;
        state.put(field, old);
        state.last_updated = now;
        Ok(())
    }

    /// Record a score. A scored assessment is complete.
    pub fn record_score(
        &mut self,
        catalog: &Catalog,
        code: &str,
        key: &str,
        score: Score,
        now: NaiveDateTime,
    ) -> StudyResult<Vec<Change>> {
        let scored = self.update_assessment(catalog, code, key, FieldValue::Score(score), now)?;
        let status = self.update_assessment(
            catalog,
            code,
            key,
            FieldValue::Status(Status::Completed),
            now,
        )?;
        Ok(vec![scored, status])
    }

    /// Add study hours to the running total and this week's log, and
    /// optionally to a course and one of its assessments.
    pub fn log_hours(
        &mut self,
        catalog: &Catalog,
        hours: f64,
        course: Option<&str>,
        assessment: Option<&str>,
        now: NaiveDateTime,
    ) -> StudyResult<Change> {
        if let (Some(code), Some(key)) = (course, assessment) {
            let state = self.state_mut(catalog, code, key, now)?;
            state.hours_logged = Some(round_hours(state.hours_logged.unwrap_or(0.0) + hours));
            state.last_updated = now;
        }

        let today = now.date();
        let week = week_key(today);
        let log = self.weekly_log.entry(week.clone()).or_insert_with(|| WeekLog {
            week_of: week_start(today),
            study_hours: 0.0,
            hours_by_course: BTreeMap::new(),
        });
        log.study_hours = round_hours(log.study_hours + hours);
        if let Some(code) = course {
            let by_course = log.hours_by_course.entry(code.to_string()).or_insert(0.0);
            *by_course = round_hours(*by_course + hours);
        }

        self.total_hours = round_hours(self.total_hours + hours);

        Ok(Change::Hours {
            week,
            course: course.map(String::from),
            assessment: assessment.map(String::from),
            added: hours,
        })
    }

    /// Take back hours added by `log_hours` (undo).
    pub fn unlog_hours(
        &mut self,
        catalog: &Catalog,
        week: &str,
        course: Option<&str>,
        assessment: Option<&str>,
        hours: f64,
        now: NaiveDateTime,
    ) -> StudyResult<()> {
        if let (Some(code), Some(key)) = (course, assessment) {
            let state = self.state_mut(catalog, code, key, now)?;
            let remaining = round_hours(state.hours_logged.unwrap_or(0.0) - hours).max(0.0);
            state.hours_logged = if remaining > 0.0 { Some(remaining) } else { None };
            state.last_updated = now;
        }

        if let Some(log) = self.weekly_log.get_mut(week) {
            log.study_hours = round_hours(log.study_hours - hours).max(0.0);
            if let Some(code) = course {
                if let Some(by_course) = log.hours_by_course.get_mut(code) {
                    *by_course = round_hours(*by_course - hours).max(0.0);
                }
                log.hours_by_course.retain(|_, h| *h > 0.0);
            }
            if log.study_hours == 0.0 && log.hours_by_course.is_empty() {
                self.weekly_log.remove(week);
            }
        }

        self.total_hours = round_hours(self.total_hours - hours).max(0.0);
        Ok(())
    }

    /// Undo one recorded change.
    pub fn revert(
        &mut self,
        catalog: &Catalog,
        change: &Change,
        now: NaiveDateTime,
    ) -> StudyResult<()> {
        match change {
            Change::Field {
                course,
                key,
                old,
                new,
            } => self.restore_field(catalog, course, key, new.field(), old.clone(), now),
            Change::Hours {
                week,
                course,
                assessment,
                added,
            } => self.unlog_hours(
                catalog,
                week,
                course.as_deref(),
                assessment.as_deref(),
                *added,
                now,
            ),
        }
    }

    pub fn week(&self, date: NaiveDate) -> Option<&WeekLog> {
        self.weekly_log.get(&week_key(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATALOG;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-10-17T10:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn setup() -> (Catalog, TrackerDocument) {
        let catalog = Catalog::from_toml(DEFAULT_CATALOG).unwrap();
        let doc = TrackerDocument::from_catalog(&catalog, now());
        (catalog, doc)
    }

    #[test]
    fn test_from_catalog_seeds_every_pair() {
        let (catalog, doc) = setup();
        assert_eq!(doc.courses.len(), catalog.courses.len());
        assert_eq!(
            doc.state("ELEC70028", "core_part_2").unwrap().status,
            Status::NotStarted
        );
        assert_eq!(
            doc.state("ELEC70066", "irat_tests").unwrap().status,
            Status::Ongoing,
            "Recurring assessments start as ongoing"
        );
        assert!(doc.dangling_references(&catalog).is_empty());
    }

    #[test]
    fn test_update_returns_previous_value() {
        let (catalog, mut doc) = setup();
        doc.update_assessment(
            &catalog,
            "ELEC70028",
            "core_part_2",
            FieldValue::Status(Status::InProgress),
            now(),
        )
        .unwrap();
        doc.log_hours(&catalog, 3.0, Some("ELEC70028"), None, now())
            .unwrap();
        let before = doc.clone();
        let later = now() + Duration::hours(2);

        let change = doc
            .update_assessment(
                &catalog,
                "ELEC70028",
                "core_part_2",
                FieldValue::Status(Status::Submitted),
                later,
            )
            .unwrap();

        match change {
            Change::Field { old, .. } => {
                assert_eq!(old, Some(FieldValue::Status(Status::InProgress)))
            }
            other => panic!("Expected a field change, got {other:?}"),
        }
        let state = doc.state("ELEC70028", "core_part_2").unwrap();
        assert_eq!(state.status, Status::Submitted);
        assert_eq!(state.last_updated, later);

        // Nothing else moved.
        let mut expected = before.clone();
        let target = expected
            .courses
            .get_mut("ELEC70028")
            .and_then(|c| c.get_mut("core_part_2"))
            .unwrap();
        target.status = Status::Submitted;
        target.last_updated = later;
        assert_eq!(doc, expected);
        assert_eq!(doc.total_hours, before.total_hours);
        assert_eq!(doc.weekly_log, before.weekly_log);

        let entry = crate::deadlines::summary(&catalog, &doc, now().date())
            .into_iter()
            .find(|e| e.course_code == "ELEC70028" && e.key == "core_part_2")
            .unwrap();
        assert_eq!(entry.status, Status::Submitted);
    }

    #[test]
    fn test_update_rejects_unknown_pair() {
        let (catalog, mut doc) = setup();
        let before = doc.clone();

        let err = doc
            .update_assessment(
                &catalog,
                "ELEC70028",
                "nope",
                FieldValue::Status(Status::Completed),
                now(),
            )
            .unwrap_err();

        assert!(matches!(err, StudyError::UnknownAssessment { .. }));
        assert_eq!(doc, before, "A rejected update must not touch the document");
    }

    #[test]
    fn test_record_score_completes_assessment() {
        let (catalog, mut doc) = setup();
        let changes = doc
            .record_score(&catalog, "ELEC70082", "ps1", Score::Text("17/20".into()), now())
            .unwrap();

        assert_eq!(changes.len(), 2);
        let state = doc.state("ELEC70082", "ps1").unwrap();
        assert_eq!(state.status, Status::Completed);
        assert_eq!(state.score, Some(Score::Text("17/20".into())));
    }

    #[test]
    fn test_log_hours_updates_week_and_course() {
        let (catalog, mut doc) = setup();
        doc.log_hours(&catalog, 2.5, Some("ELEC70028"), Some("core_part_2"), now())
            .unwrap();
        doc.log_hours(&catalog, 1.0, None, None, now()).unwrap();

        assert_eq!(doc.total_hours, 3.5);
        let week = doc.week(now().date()).unwrap();
        assert_eq!(week.study_hours, 3.5);
        assert_eq!(week.hours_by_course["ELEC70028"], 2.5);
        assert_eq!(week.week_of.to_string(), "2026-10-12");
        assert_eq!(
            doc.state("ELEC70028", "core_part_2").unwrap().hours_logged,
            Some(2.5)
        );
    }

    #[test]
    fn test_revert_restores_document() {
        let (catalog, mut doc) = setup();
        let original = doc.clone();

        let changes = doc
            .record_score(&catalog, "ELEC70082", "ps1", Score::Number(85.0), now())
            .unwrap();
        let hours = doc
            .log_hours(&catalog, 2.0, Some("ELEC70082"), Some("ps1"), now())
            .unwrap();

        doc.revert(&catalog, &hours, now()).unwrap();
        for change in changes.iter().rev() {
            doc.revert(&catalog, change, now()).unwrap();
        }

        let state = doc.state("ELEC70082", "ps1").unwrap();
        let before = original.state("ELEC70082", "ps1").unwrap();
        assert_eq!(state.status, before.status);
        assert_eq!(state.score, None);
        assert_eq!(state.hours_logged, None);
        assert_eq!(doc.total_hours, 0.0);
        assert!(doc.weekly_log.is_empty());
    }

    #[test]
    fn test_week_key_uses_iso_weeks() {
        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(week_key(date), "2026-W53");
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{
            "status": "in_progress",
            "last_updated": "2026-10-17T10:00:00",
            "notes": "ask about part (c)"
        }"#;
        let state: AssessmentState = serde_json::from_str(json).unwrap();
        assert_eq!(state.extra["notes"], "ask about part (c)");

        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["notes"], "ask about part (c)");
    }
}
