use anyhow::Result;
use study_core::clock::Clock;
use study_core::deadlines::{self, DeadlineEntry};
use study_core::study_dir::StudyDir;

use crate::render::{Render, bold, dimmed, red};

pub fn run(study: &StudyDir, clock: &dyn Clock, count: usize, weeks: Option<u32>) -> Result<()> {
    let catalog = study.catalog()?;
    let doc = study.store().load(&catalog)?;
    let today = clock.today();

    let upcoming = deadlines::upcoming(&catalog, &doc, today);
    if upcoming.is_empty() {
        println!("{}", dimmed("No upcoming deadlines"));
        return Ok(());
    }

    let horizon = weeks.map(|w| i64::from(w) * 7);
    let in_horizon = |e: &&DeadlineEntry| horizon.is_none_or(|days| e.days_remaining <= days);

    // Overdue work is always shown; the count limits what comes after it.
    let mut remaining = count;
    let mut take = |entries: &[DeadlineEntry]| -> Vec<DeadlineEntry> {
        let shown: Vec<DeadlineEntry> = entries
            .iter()
            .filter(in_horizon)
            .take(remaining)
            .cloned()
            .collect();
        remaining -= shown.len();
        shown
    };

    let sections = [
        ("This week", take(&upcoming.this_week)),
        ("Next week", take(&upcoming.next_week)),
        ("Later", take(&upcoming.later)),
    ];

    if !upcoming.overdue.is_empty() {
        println!("{}", red("Overdue"));
        for entry in &upcoming.overdue {
            println!("   {}", entry.render());
        }
        println!();
    }

    for (title, entries) in sections.iter().filter(|(_, e)| !e.is_empty()) {
        println!("{}", bold(title));
        for entry in entries {
            println!("   {}", entry.render());
        }
        println!();
    }

    Ok(())
}
