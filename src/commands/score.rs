use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;
use study_core::validation;

use crate::render::bold;

pub fn run(
    study: &StudyDir,
    clock: &dyn Clock,
    course: &str,
    assessment: &str,
    score: &str,
) -> Result<()> {
    let catalog = study.catalog()?;
    let (course, def) = super::resolve(&catalog, course, assessment)?;
    let score = validation::resolve_score(score)?;

    let now = clock.now();
    let changes = study.store().modify(&catalog, clock, |doc| {
        doc.record_score(&catalog, &course.code, &def.key, score.clone(), now)
    })?;

    super::confirm(&format!(
        "{}: scored {} (completed)",
        super::label(course, def),
        bold(&score.to_string())
    ));

    super::record(
        study,
        clock,
        format!("{} {}: score {}", course.alias, def.key, score),
        changes,
    );
    Ok(())
}
