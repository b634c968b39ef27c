use anyhow::Result;
use study_core::config::StudyConfig;
use study_core::study_dir::StudyDir;

use crate::render::{bold, dimmed};

pub fn run(study: &StudyDir) -> Result<()> {
    let config = study.config();
    let store = study.store();

    println!("{}", bold("Paths"));
    println!("   config     {}", StudyConfig::config_path()?.display());
    println!("   data       {}", study.data_path().display());
    println!("   tracker    {}", store.path().display());
    println!("   catalog    {}", catalog_line(study));
    println!("   history    {}", study.history_path().display());
    println!("   backups    {}", store.backups().dir().display());

    println!("\n{}", bold("Settings"));
    println!("   calendar_name     {}", config.calendar_name);
    println!("   max_backups       {}", config.max_backups);
    println!("   sync_weeks        {}", config.sync_weeks);
    println!("   calendar_timeout  {}", config.calendar_timeout);
    println!("   calendar_retries  {}", config.calendar_retries);

    println!("\n{}", dimmed("Override any setting with STUDY_<NAME>, e.g. STUDY_SYNC_WEEKS=4"));
    Ok(())
}

fn catalog_line(study: &StudyDir) -> String {
    let path = study.catalog_path();
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} {}", path.display(), dimmed("(missing, using built-in)"))
    }
}
