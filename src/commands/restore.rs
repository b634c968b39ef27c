use anyhow::Result;
use dialoguer::Confirm;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;

use crate::render::yellow;

pub fn run(study: &StudyDir, clock: &dyn Clock, name: &str, yes: bool) -> Result<()> {
    let catalog = study.catalog()?;
    let store = study.store();

    // Fail on an unknown name before asking anything.
    let entry = store.backups().find(name)?;

    if !yes {
        println!(
            "{}",
            yellow(&format!(
                "This replaces {} with {}.",
                store.path().display(),
                entry.name
            ))
        );
        println!("The current tracker is backed up first.\n");

        let confirmed = Confirm::new()
            .with_prompt("Restore this backup?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let restored = store.restore(&catalog, &entry.name, clock)?;
    super::confirm(&format!("Restored tracker from {}", restored.name));
    Ok(())
}
