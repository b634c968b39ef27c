use anyhow::Result;
use study_core::clock::Clock;
use study_core::deadlines;
use study_core::study_dir::StudyDir;

use crate::render::{Render, bold, countdown, cyan, dimmed, red};

pub fn run(study: &StudyDir, clock: &dyn Clock) -> Result<()> {
    let catalog = study.catalog()?;
    let doc = study.store().load(&catalog)?;
    let today = clock.today();

    for course in &catalog.courses {
        println!(
            "{} {} {}",
            cyan(&format!("[{}]", course.alias)),
            bold(&course.name),
            dimmed(&course.code)
        );

        for (n, def) in course.assessments.iter().enumerate() {
            let current = deadlines::current(&catalog, &doc, course, def, today);
            let status = match &current {
                Some(entry) => entry.effective,
                None => deadlines::stored_status(&doc, course, def),
            };

            let mut line = format!("   {:>2}. {:<28} {:<11}", n + 1, def.name, status.render());

            match (&def.due, &current) {
                (Some(due), Some(entry)) => {
                    // An exam window that has started but not ended counts as today.
                    let days = if entry.end_date >= today {
                        entry.days_remaining.max(0)
                    } else {
                        entry.days_remaining
                    };
                    let due = dimmed(&due.to_string());
                    line.push_str(&format!("  {}  {}", due, countdown(days, status)));
                }
                _ if !def.recurring => line.push_str(&format!("  {}", dimmed("date TBD"))),
                _ => {}
            }

            if let Some(score) = doc.state(&course.code, &def.key).and_then(|s| s.score.as_ref()) {
                line.push_str(&format!("  score {}", bold(&score.to_string())));
            }
            println!("{}", line);
        }
        println!();
    }

    println!("Progress: {}", deadlines::progress(&catalog, &doc).render());

    let upcoming = deadlines::upcoming(&catalog, &doc, today);
    if !upcoming.overdue.is_empty() {
        println!("Overdue: {}", red(&upcoming.overdue.len().to_string()));
    }
    let next = upcoming
        .this_week
        .first()
        .or(upcoming.next_week.first())
        .or(upcoming.later.first());
    match next {
        Some(entry) => println!("Next: {}", entry.render()),
        None => println!("Next: {}", dimmed("nothing scheduled")),
    }
    println!("Hours logged: {}", doc.total_hours);

    Ok(())
}
