//! Deadline summaries and progress figures derived from the catalog and the
//! tracker document.

use chrono::{Duration, NaiveDate};

use crate::calendar::EventCategory;
use crate::catalog::{AssessmentDef, Catalog, Course, Due};
use crate::status::Status;
use crate::tracker::{TrackerDocument, week_start};

#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineEntry {
    pub course_code: String,
    pub course_alias: String,
    pub course_name: String,
    pub key: String,
    pub name: String,
    pub weight: Option<String>,
    pub category: EventCategory,
    pub date: NaiveDate,
    /// Last day of an exam window; same as `date` for plain deadlines.
    pub end_date: NaiveDate,
    pub days_remaining: i64,
    /// What the tracker says.
    pub status: Status,
    /// `status`, except unfinished work past its date reads as overdue.
    pub effective: Status,
}

#[derive(Debug, Default)]
pub struct Upcoming {
    pub overdue: Vec<DeadlineEntry>,
    pub this_week: Vec<DeadlineEntry>,
    pub next_week: Vec<DeadlineEntry>,
    pub later: Vec<DeadlineEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub done: usize,
    pub in_progress: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (self.done * 100 / self.total) as u32
        }
    }
}

impl Upcoming {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty()
            && self.this_week.is_empty()
            && self.next_week.is_empty()
            && self.later.is_empty()
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.this_week.len() + self.next_week.len() + self.later.len()
    }
}

pub fn effective_status(status: Status, date: NaiveDate, today: NaiveDate) -> Status {
    match status {
        Status::NotStarted | Status::InProgress if date < today => Status::Overdue,
        other => other,
    }
}

/// The stored status, or the starting status for an untouched assessment.
pub fn stored_status(doc: &TrackerDocument, course: &Course, def: &AssessmentDef) -> Status {
    match doc.state(&course.code, &def.key) {
        Some(state) => state.status,
        None if def.recurring => Status::Ongoing,
        None => Status::NotStarted,
    }
}

/// One entry per dated occurrence of every assessment, soonest first.
pub fn summary(catalog: &Catalog, doc: &TrackerDocument, today: NaiveDate) -> Vec<DeadlineEntry> {
    let mut entries = Vec::new();

    for (course, def) in catalog.pairs() {
        let Some(due) = &def.due else { continue };
        let status = stored_status(doc, course, def);

        let occurrences: Vec<(NaiveDate, NaiveDate, EventCategory)> = match due {
            Due::Date(d) => vec![(*d, *d, EventCategory::Deadline)],
            Due::Dates(dates) => dates
                .iter()
                .map(|d| (*d, *d, EventCategory::Deadline))
                .collect(),
            Due::Range { from, to } => vec![(*from, *to, EventCategory::Exam)],
        };

        for (date, end_date, category) in occurrences {
            entries.push(DeadlineEntry {
                course_code: course.code.clone(),
                course_alias: course.alias.clone(),
                course_name: course.name.clone(),
                key: def.key.clone(),
                name: def.name.clone(),
                weight: def.weight.clone(),
                category,
                date,
                end_date,
                days_remaining: (date - today).num_days(),
                status,
                effective: effective_status(status, end_date, today),
            });
        }
    }

    entries.sort_by(|a, b| {
        (a.date, &a.course_code, &a.key).cmp(&(b.date, &b.course_code, &b.key))
    });
    entries
}

/// The occurrence of one assessment that matters today: the first one still
/// running or ahead, or the last one once every date has passed.
pub fn current(
    catalog: &Catalog,
    doc: &TrackerDocument,
    course: &Course,
    def: &AssessmentDef,
    today: NaiveDate,
) -> Option<DeadlineEntry> {
    let mut occurrences: Vec<DeadlineEntry> = summary(catalog, doc, today)
        .into_iter()
        .filter(|e| e.course_code == course.code && e.key == def.key)
        .collect();

    match occurrences.iter().position(|e| e.end_date >= today) {
        Some(i) => Some(occurrences.swap_remove(i)),
        None => occurrences.pop(),
    }
}

/// Unfinished deadlines, bucketed by calendar week.
pub fn upcoming(catalog: &Catalog, doc: &TrackerDocument, today: NaiveDate) -> Upcoming {
    let this_monday = week_start(today);
    let next_monday = this_monday + Duration::weeks(1);
    let after_next = next_monday + Duration::weeks(1);

    let mut upcoming = Upcoming::default();
    for entry in summary(catalog, doc, today) {
        if entry.status.is_done() || entry.status == Status::Ongoing {
            continue;
        }

        if entry.effective == Status::Overdue {
            upcoming.overdue.push(entry);
        } else if entry.date < next_monday {
            upcoming.this_week.push(entry);
        } else if entry.date < after_next {
            upcoming.next_week.push(entry);
        } else {
            upcoming.later.push(entry);
        }
    }
    upcoming
}

/// Done and in-progress counts over every non-recurring assessment.
pub fn progress(catalog: &Catalog, doc: &TrackerDocument) -> Progress {
    let mut progress = Progress::default();
    for (course, def) in catalog.pairs() {
        let status = stored_status(doc, course, def);
        if status == Status::Ongoing {
            continue;
        }
        progress.total += 1;
        if status.is_done() {
            progress.done += 1;
        } else if status == Status::InProgress {
            progress.in_progress += 1;
        }
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATALOG;
    use crate::tracker::FieldValue;
    use chrono::NaiveDateTime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup() -> (Catalog, TrackerDocument) {
        let catalog = Catalog::from_toml(DEFAULT_CATALOG).unwrap();
        let now = NaiveDateTime::parse_from_str("2026-10-17T10:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        let doc = TrackerDocument::from_catalog(&catalog, now);
        (catalog, doc)
    }

    fn set(catalog: &Catalog, doc: &mut TrackerDocument, code: &str, key: &str, status: Status) {
        let now = NaiveDateTime::parse_from_str("2026-10-17T10:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        doc.update_assessment(catalog, code, key, FieldValue::Status(status), now)
            .unwrap();
    }

    #[test]
    fn test_effective_status() {
        let today = date("2026-10-17");
        assert_eq!(
            effective_status(Status::InProgress, date("2026-10-16"), today),
            Status::Overdue
        );
        assert_eq!(
            effective_status(Status::InProgress, date("2026-10-17"), today),
            Status::InProgress,
            "Due today is not overdue yet"
        );
        assert_eq!(
            effective_status(Status::Submitted, date("2026-10-01"), today),
            Status::Submitted
        );
    }

    #[test]
    fn test_summary_reflects_submitted_status() {
        let (catalog, mut doc) = setup();
        set(&catalog, &mut doc, "ELEC70028", "core_part_2", Status::Submitted);

        let entries = summary(&catalog, &doc, date("2026-10-17"));
        let entry = entries
            .iter()
            .find(|e| e.key == "core_part_2" && e.course_code == "ELEC70028")
            .unwrap();
        assert_eq!(entry.status, Status::Submitted);
        assert_eq!(entry.days_remaining, 55);
    }

    #[test]
    fn test_summary_is_sorted_and_skips_tbd() {
        let (catalog, doc) = setup();
        let entries = summary(&catalog, &doc, date("2026-10-17"));

        assert!(entries.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(
            !entries.iter().any(|e| e.course_code == "ELEC70066" && e.key == "exam"),
            "Assessments without a date have no deadline"
        );
        let exam = entries
            .iter()
            .find(|e| e.course_code == "ELEC70028" && e.key == "exam")
            .unwrap();
        assert_eq!(exam.category, EventCategory::Exam);
        assert_eq!(exam.end_date, date("2027-01-15"));
    }

    #[test]
    fn test_current_mid_exam_window_is_not_overdue() {
        let (catalog, doc) = setup();
        let course = catalog.course("ELEC70028").unwrap();
        let exam = course.assessment("exam").unwrap();

        // Day three of the 11-15 Jan window.
        let entry = current(&catalog, &doc, course, exam, date("2027-01-13")).unwrap();
        assert_eq!(entry.effective, Status::NotStarted);
        assert_eq!(entry.days_remaining, -2);

        let entry = current(&catalog, &doc, course, exam, date("2027-01-16")).unwrap();
        assert_eq!(entry.effective, Status::Overdue);
    }

    #[test]
    fn test_current_picks_next_pending_date() {
        let catalog = Catalog::from_toml(
            r#"
[[courses]]
code = "X1"
alias = "x"
name = "Example"

[[courses.assessments]]
key = "quiz"
name = "Quiz"
due = ["2026-10-10", "2026-10-20", "2026-10-30"]
"#,
        )
        .unwrap();
        let now = NaiveDateTime::parse_from_str("2026-10-17T10:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap();
        let doc = TrackerDocument::from_catalog(&catalog, now);
        let course = catalog.course("X1").unwrap();
        let quiz = course.assessment("quiz").unwrap();

        let entry = current(&catalog, &doc, course, quiz, date("2026-10-17")).unwrap();
        assert_eq!(entry.date, date("2026-10-20"));
        assert_eq!(entry.effective, Status::NotStarted);

        let entry = current(&catalog, &doc, course, quiz, date("2026-11-02")).unwrap();
        assert_eq!(entry.date, date("2026-10-30"));
        assert_eq!(entry.effective, Status::Overdue);
    }

    #[test]
    fn test_upcoming_buckets() {
        let (catalog, mut doc) = setup();
        // Saturday 24 Oct: ps1 (23 Oct) has passed, basic_part_1 (30 Oct) is next week.
        let today = date("2026-10-24");
        set(&catalog, &mut doc, "ELEC70028", "basic_part_2", Status::Completed);

        let upcoming = upcoming(&catalog, &doc, today);
        assert!(upcoming.overdue.iter().any(|e| e.key == "ps1"));
        assert!(upcoming.next_week.iter().any(|e| e.key == "basic_part_1"));
        assert!(
            !upcoming.later.iter().any(|e| e.key == "basic_part_2"),
            "Completed work is not upcoming"
        );
    }

    #[test]
    fn test_progress_excludes_ongoing() {
        let (catalog, mut doc) = setup();
        set(&catalog, &mut doc, "ELEC70082", "ps1", Status::Submitted);
        set(&catalog, &mut doc, "ELEC70082", "ps2", Status::InProgress);

        let progress = progress(&catalog, &doc);
        let recurring = catalog.pairs().filter(|(_, a)| a.recurring).count();
        assert_eq!(progress.total, catalog.pairs().count() - recurring);
        assert_eq!(progress.done, 1);
        assert_eq!(progress.in_progress, 1);
    }
}
