use std::path::Path;

use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;

use crate::render::dimmed;

pub fn run(study: &StudyDir, clock: &dyn Clock) -> Result<()> {
    let outcome = study.init(clock)?;

    report(outcome.catalog_written, &study.catalog_path());
    report(outcome.tracker_written, study.store().path());

    if outcome.catalog_written {
        println!("\nEdit the catalog to match your courses, then run `study status`.");
    }

    Ok(())
}

fn report(written: bool, path: &Path) {
    if written {
        super::confirm(&format!("Created {}", path.display()));
    } else {
        println!("  {}", dimmed(&format!("{} already exists", path.display())));
    }
}
