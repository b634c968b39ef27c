use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;

use crate::render::dimmed;

pub fn run(study: &StudyDir, clock: &dyn Clock) -> Result<()> {
    let catalog = study.catalog()?;
    let store = study.store();

    match study.history().undo(&store, &catalog, clock)? {
        Some(entry) => super::confirm(&format!(
            "Undid: {} {}",
            entry.description,
            dimmed(&format!("({})", entry.timestamp.format("%Y-%m-%d %H:%M")))
        )),
        None => println!("Nothing to undo"),
    }
    Ok(())
}
