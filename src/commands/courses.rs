use anyhow::Result;
use study_core::study_dir::StudyDir;

use crate::render::{bold, cyan, dimmed};

pub fn run(study: &StudyDir) -> Result<()> {
    let catalog = study.catalog()?;

    for (i, course) in catalog.courses.iter().enumerate() {
        println!(
            "{} {} {}",
            cyan(&format!("[{}]", course.alias)),
            bold(&course.code),
            course.name
        );
        for (n, def) in course.assessments.iter().enumerate() {
            let due = def.due.as_ref().map(|d| d.to_string()).unwrap_or_default();
            println!("   {:>2}. {:<16} {}", n + 1, def.key, dimmed(&due));
        }

        if i < catalog.courses.len() - 1 {
            println!();
        }
    }

    Ok(())
}
