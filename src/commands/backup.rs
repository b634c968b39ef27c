use anyhow::Result;
use study_core::study_dir::StudyDir;

use crate::render::{Render, dimmed, pluralize};

pub fn run(study: &StudyDir) -> Result<()> {
    let store = study.store();
    let backups = store.backups().list()?;

    if backups.is_empty() {
        println!("{}", dimmed("No backups yet. One is taken before every change."));
        return Ok(());
    }

    println!(
        "{} {} in {} (newest first)",
        backups.len(),
        pluralize("backup", backups.len()),
        store.backups().dir().display()
    );
    for entry in &backups {
        println!("   {}", entry.render());
    }
    println!("\nRestore one with `study restore <name>`");
    Ok(())
}
