use anyhow::Result;
use study_core::clock::Clock;
use study_core::deadlines;
use study_core::study_dir::StudyDir;
use study_core::tracker::{week_key, week_start};

use crate::render::{Render, bold, dimmed};

/// History entries shown under "Recent activity".
const RECENT_ACTIVITY: usize = 5;

pub fn run(study: &StudyDir, clock: &dyn Clock) -> Result<()> {
    let catalog = study.catalog()?;
    let doc = study.store().load(&catalog)?;
    let today = clock.today();
    let monday = week_start(today);

    println!(
        "{}",
        bold(&format!("Week {} (from {})", week_key(today), monday.format("%a %d %b")))
    );

    let hours = doc.week(today);
    println!(
        "\nStudy hours: {}",
        hours.map(|w| w.study_hours).unwrap_or(0.0)
    );
    if let Some(week) = hours {
        for (code, h) in &week.hours_by_course {
            let alias = catalog
                .course(code)
                .map(|c| c.alias.as_str())
                .unwrap_or(code.as_str());
            println!("   {:<6} {}", alias, h);
        }
    }

    let upcoming = deadlines::upcoming(&catalog, &doc, today);
    println!("\nDue this week:");
    if upcoming.this_week.is_empty() {
        println!("   {}", dimmed("nothing"));
    }
    for entry in &upcoming.this_week {
        println!("   {}", entry.render());
    }

    let recent: Vec<_> = study
        .history()
        .recent(RECENT_ACTIVITY)
        .into_iter()
        .filter(|e| e.timestamp.date() >= monday)
        .collect();
    if !recent.is_empty() {
        println!("\nRecent activity:");
        for entry in recent {
            println!(
                "   {} {}",
                dimmed(&entry.timestamp.format("%a %H:%M").to_string()),
                entry.description
            );
        }
    }

    println!("\nProgress: {}", deadlines::progress(&catalog, &doc).render());
    Ok(())
}
