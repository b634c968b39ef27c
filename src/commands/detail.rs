//! Optional free-text fields on an assessment.

use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;
use study_core::tracker::FieldValue;

pub fn partner(
    study: &StudyDir,
    clock: &dyn Clock,
    course: &str,
    assessment: &str,
    name: &str,
) -> Result<()> {
    set(study, clock, course, assessment, FieldValue::Partner(name.trim().to_string()))
}

pub fn paper(
    study: &StudyDir,
    clock: &dyn Clock,
    course: &str,
    assessment: &str,
    title: &str,
) -> Result<()> {
    set(study, clock, course, assessment, FieldValue::PaperTopic(title.trim().to_string()))
}

fn set(
    study: &StudyDir,
    clock: &dyn Clock,
    course: &str,
    assessment: &str,
    value: FieldValue,
) -> Result<()> {
    let catalog = study.catalog()?;
    let (course, def) = super::resolve(&catalog, course, assessment)?;

    let now = clock.now();
    let field = value.field();
    let change = study.store().modify(&catalog, clock, |doc| {
        doc.update_assessment(&catalog, &course.code, &def.key, value.clone(), now)
    })?;

    super::confirm(&format!("{}: {} set to {}", super::label(course, def), field, value));
    super::record(
        study,
        clock,
        format!("{} {}: {} {}", course.alias, def.key, field, value),
        vec![change],
    );
    Ok(())
}
