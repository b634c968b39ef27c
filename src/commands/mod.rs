pub mod backup;
pub mod calendar;
pub mod config;
pub mod courses;
pub mod detail;
pub mod history;
pub mod init;
pub mod log;
pub mod next;
pub mod restore;
pub mod score;
pub mod status;
pub mod undo;
pub mod update;
pub mod week;

use anyhow::Result;
use study_core::catalog::{AssessmentDef, Catalog, Course};
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;
use study_core::tracker::{Change, HistoryEntry};
use study_core::validation;
use tracing::warn;

use crate::render::{cyan, green};

/// Resolve a course and one of its assessments from user input.
pub fn resolve<'a>(
    catalog: &'a Catalog,
    course: &str,
    assessment: &str,
) -> Result<(&'a Course, &'a AssessmentDef)> {
    let course = validation::resolve_course(catalog, course)?;
    let def = validation::resolve_assessment(course, assessment)?;
    Ok((course, def))
}

/// Append a history entry for changes that have already been saved.
///
/// The tracker write has succeeded by now, so a failure here only loses the
/// ability to undo.
pub fn record(study: &StudyDir, clock: &dyn Clock, description: String, changes: Vec<Change>) {
    let entry = HistoryEntry::new(clock.now(), description, changes);
    if let Err(e) = study.history().record(entry) {
        warn!(error = %e, "Could not record history");
    }
}

/// "[pc] Basic Part 1"
pub fn label(course: &Course, def: &AssessmentDef) -> String {
    format!("{} {}", cyan(&format!("[{}]", course.alias)), def.name)
}

pub fn confirm(message: &str) {
    println!("{} {}", green("✓"), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use study_core::clock::FixedClock;
    use study_core::config::StudyConfig;
    use study_core::{Status, StudyError};

    fn setup() -> (tempfile::TempDir, StudyDir, FixedClock) {
        let dir = tempfile::tempdir().unwrap();
        let study = StudyDir::with_config(StudyConfig::default(), Some(dir.path().to_path_buf()));
        let clock = FixedClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        study.init(&clock).unwrap();
        (dir, study, clock)
    }

    fn status_of(study: &StudyDir, code: &str, key: &str) -> Status {
        let catalog = study.catalog().unwrap();
        let doc = study.store().load(&catalog).unwrap();
        doc.state(code, key).unwrap().status
    }

    #[test]
    fn test_update_records_history_and_undo_reverts() {
        let (_dir, study, clock) = setup();

        update::run(&study, &clock, "pc", "basic_part_1", "done").unwrap();
        assert_eq!(status_of(&study, "ELEC70028", "basic_part_1"), Status::Completed);
        assert_eq!(study.history().entries().len(), 1);

        undo::run(&study, &clock).unwrap();
        assert_eq!(status_of(&study, "ELEC70028", "basic_part_1"), Status::NotStarted);
        assert!(study.history().entries().is_empty());
    }

    #[test]
    fn test_numbered_shortcut_and_alias() {
        let (_dir, study, clock) = setup();

        update::run(&study, &clock, "PC", "2", "wip").unwrap();
        assert_eq!(status_of(&study, "ELEC70028", "basic_part_2"), Status::InProgress);
    }

    #[test]
    fn test_unknown_course_is_user_error_and_writes_nothing() {
        let (_dir, study, clock) = setup();

        let err = update::run(&study, &clock, "zz", "1", "done").unwrap_err();
        let study_err = err.downcast_ref::<StudyError>().unwrap();
        assert_eq!(study_err.class(), "UnknownCourseError");
        assert!(study_err.is_user_input());

        assert!(study.history().entries().is_empty());
        assert!(study.store().backups().list().unwrap().is_empty());
    }

    #[test]
    fn test_score_completes_and_undo_restores_both_fields() {
        let (_dir, study, clock) = setup();

        score::run(&study, &clock, "cv", "pr", "17/20").unwrap();
        let catalog = study.catalog().unwrap();
        let doc = study.store().load(&catalog).unwrap();
        let state = doc.state("ELEC70073", "pr_coursework").unwrap();
        assert_eq!(state.status, Status::Completed);
        assert_eq!(state.score.as_ref().unwrap().to_string(), "17/20");

        undo::run(&study, &clock).unwrap();
        let doc = study.store().load(&catalog).unwrap();
        let state = doc.state("ELEC70073", "pr_coursework").unwrap();
        assert_eq!(state.status, Status::NotStarted);
        assert!(state.score.is_none());
    }

    #[test]
    fn test_log_hours() {
        let (_dir, study, clock) = setup();

        log::run(&study, &clock, "2.5", Some("do"), Some("ps1")).unwrap();
        log::run(&study, &clock, "1", None, None).unwrap();

        let catalog = study.catalog().unwrap();
        let doc = study.store().load(&catalog).unwrap();
        assert_eq!(doc.total_hours, 3.5);
        assert_eq!(doc.state("ELEC70082", "ps1").unwrap().hours_logged, Some(2.5));
        assert_eq!(doc.week(clock.today()).unwrap().study_hours, 3.5);
        assert_eq!(study.history().entries().len(), 2);
    }

    #[test]
    fn test_log_rejects_bad_hours() {
        let (_dir, study, clock) = setup();

        let err = log::run(&study, &clock, "30", None, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudyError>(),
            Some(StudyError::InvalidHours { .. })
        ));
    }

    #[test]
    fn test_partner_and_paper() {
        let (_dir, study, clock) = setup();

        detail::partner(&study, &clock, "cv", "cv_coursework", "Ada Lovelace").unwrap();
        detail::paper(&study, &clock, "do", "paper", "Adam Revisited").unwrap();

        let catalog = study.catalog().unwrap();
        let doc = study.store().load(&catalog).unwrap();
        assert_eq!(
            doc.state("ELEC70073", "cv_coursework").unwrap().partner.as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(
            doc.state("ELEC70082", "paper_study").unwrap().paper_topic.as_deref(),
            Some("Adam Revisited")
        );
    }

    #[test]
    fn test_restore_with_yes_skips_prompt() {
        let (_dir, study, clock) = setup();

        update::run(&study, &clock, "pc", "1", "done").unwrap();
        let backups = study.store().backups().list().unwrap();
        assert_eq!(backups.len(), 1);

        clock.advance(chrono::Duration::seconds(5));
        restore::run(&study, &clock, &backups[0].name, true).unwrap();
        assert_eq!(status_of(&study, "ELEC70028", "basic_part_1"), Status::NotStarted);
    }
}
