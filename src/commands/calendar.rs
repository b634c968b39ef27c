use anyhow::Result;
use study_core::calendar::{
    ExternalCalendar, Reconciler, ScriptCalendar, SyncMode, SyncReport, desired_events,
};
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;

use crate::render::{Render, bold, dimmed, pluralize, render_plan};
use crate::utils::tui::create_spinner;

pub struct SyncOptions {
    pub mode: SyncMode,
    pub dry_run: bool,
    pub verbose: bool,
}

pub async fn run(
    study: &StudyDir,
    clock: &dyn Clock,
    regen: bool,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let calendar = ScriptCalendar::new(study.config().calendar_timeout()?)?;
    let calendar_name = &study.config().calendar_name;

    if !dry_run {
        let spinner = create_spinner(format!("Opening {}", calendar_name));
        let ensured = calendar.ensure_calendar(calendar_name).await;
        spinner.finish_and_clear();
        ensured?;
    }

    let options = SyncOptions {
        mode: if regen { SyncMode::Regen } else { SyncMode::Diff },
        dry_run,
        verbose,
    };
    let report = sync_with(study, clock, &calendar, &options).await?;

    if let Some(report) = report {
        if !report.is_success() {
            anyhow::bail!(
                "{} calendar {} failed",
                report.failures.len(),
                pluralize("change", report.failures.len())
            );
        }
    }
    Ok(())
}

/// Plan against `calendar`, print the plan, and apply it unless this is a
/// dry run. Returns the report when anything was applied.
pub async fn sync_with<C: ExternalCalendar>(
    study: &StudyDir,
    clock: &dyn Clock,
    calendar: &C,
    options: &SyncOptions,
) -> Result<Option<SyncReport>> {
    let catalog = study.catalog()?;
    let doc = study.store().load(&catalog)?;
    let today = clock.today();
    let window = study.sync_window(today);
    let desired = desired_events(&catalog, &doc, &window, today);

    let calendar_name = &study.config().calendar_name;
    let reconciler = Reconciler::new(calendar, calendar_name.clone(), study.retry_policy());

    let header = format!("📅 {}", calendar_name);
    let spinner = create_spinner(header.clone());
    let plan = reconciler.plan(desired, window, options.mode).await;
    spinner.finish_and_clear();
    let plan = plan?;

    println!(
        "{} {}",
        bold(&header),
        dimmed(&format!(
            "({} to {})",
            window.from.format("%d %b"),
            (window.to - chrono::Duration::days(1)).format("%d %b %Y")
        ))
    );
    println!("{}", render_plan(&plan, options.verbose));

    if options.dry_run {
        println!("\n{}", dimmed("Dry run: the calendar was not changed"));
        return Ok(None);
    }
    if plan.is_empty() {
        return Ok(None);
    }

    let spinner = create_spinner("Applying changes".to_string());
    let report = reconciler.apply(&plan).await;
    spinner.finish_and_clear();

    println!("\n{}", report.render());
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::calendar::MemoryCalendar;
    use study_core::clock::FixedClock;
    use study_core::config::StudyConfig;

    fn setup() -> (tempfile::TempDir, StudyDir, FixedClock) {
        let dir = tempfile::tempdir().unwrap();
        let study = StudyDir::with_config(StudyConfig::default(), Some(dir.path().to_path_buf()));
        let clock = FixedClock::new(
            chrono::NaiveDate::from_ymd_opt(2026, 10, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        study.init(&clock).unwrap();
        (dir, study, clock)
    }

    fn options(mode: SyncMode, dry_run: bool) -> SyncOptions {
        SyncOptions {
            mode,
            dry_run,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_second_sync_changes_nothing() {
        let (_dir, study, clock) = setup();
        let calendar = MemoryCalendar::new();

        let first = sync_with(&study, &clock, &calendar, &options(SyncMode::Diff, false))
            .await
            .unwrap()
            .unwrap();
        assert!(first.created > 0);
        assert!(first.is_success());

        let mutations = calendar.mutations();
        let second = sync_with(&study, &clock, &calendar, &options(SyncMode::Diff, false))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(calendar.mutations(), mutations);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_calendar_alone() {
        let (_dir, study, clock) = setup();
        let calendar = MemoryCalendar::new();

        let report = sync_with(&study, &clock, &calendar, &options(SyncMode::Diff, true))
            .await
            .unwrap();
        assert!(report.is_none());
        assert_eq!(calendar.mutations(), 0);
        assert!(calendar.is_empty("Study Schedule"));
    }

    #[tokio::test]
    async fn test_missing_tracker_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let study = StudyDir::with_config(StudyConfig::default(), Some(dir.path().to_path_buf()));
        let clock = FixedClock::new(
            chrono::NaiveDate::from_ymd_opt(2026, 10, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        let calendar = MemoryCalendar::new();

        let err = sync_with(&study, &clock, &calendar, &options(SyncMode::Diff, false))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<study_core::StudyError>(),
            Some(study_core::StudyError::DataNotFound(_))
        ));
    }
}
