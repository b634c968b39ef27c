use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;
use study_core::tracker::{Change, FieldValue};
use study_core::validation;

use crate::render::Render;

pub fn run(
    study: &StudyDir,
    clock: &dyn Clock,
    course: &str,
    assessment: &str,
    status: &str,
) -> Result<()> {
    let catalog = study.catalog()?;
    let (course, def) = super::resolve(&catalog, course, assessment)?;
    let status = validation::resolve_status(status)?;

    let now = clock.now();
    let change = study.store().modify(&catalog, clock, |doc| {
        doc.update_assessment(&catalog, &course.code, &def.key, FieldValue::Status(status), now)
    })?;

    let old = match &change {
        Change::Field {
            old: Some(FieldValue::Status(old)),
            ..
        } => old.render(),
        _ => "unset".to_string(),
    };
    super::confirm(&format!(
        "{}: {} -> {}",
        super::label(course, def),
        old,
        status.render()
    ));

    super::record(
        study,
        clock,
        format!("{} {}: {}", course.alias, def.key, status),
        vec![change],
    );
    Ok(())
}
