use anyhow::Result;
use study_core::study_dir::StudyDir;

use crate::render::dimmed;

pub fn run(study: &StudyDir, count: usize) -> Result<()> {
    let entries = study.history().recent(count);
    if entries.is_empty() {
        println!("{}", dimmed("No changes recorded yet"));
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {}",
            dimmed(&entry.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            entry.description
        );
    }
    Ok(())
}
