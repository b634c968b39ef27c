use anyhow::Result;
use study_core::clock::Clock;
use study_core::study_dir::StudyDir;
use study_core::validation;

pub fn run(
    study: &StudyDir,
    clock: &dyn Clock,
    hours: &str,
    course: Option<&str>,
    assessment: Option<&str>,
) -> Result<()> {
    let hours = validation::resolve_hours(hours)?;
    let catalog = study.catalog()?;

    let course = course
        .map(|c| validation::resolve_course(&catalog, c))
        .transpose()?;
    let def = match (course, assessment) {
        (Some(course), Some(a)) => Some(validation::resolve_assessment(course, a)?),
        (None, Some(_)) => anyhow::bail!("An assessment needs a course: study log <hours> <course> <assessment>"),
        _ => None,
    };

    let code = course.map(|c| c.code.as_str());
    let key = def.map(|d| d.key.as_str());

    let now = clock.now();
    let (change, total, week) = study.store().modify(&catalog, clock, |doc| {
        let change = doc.log_hours(&catalog, hours, code, key, now)?;
        let week = doc.week(now.date()).map(|w| w.study_hours).unwrap_or(hours);
        Ok((change, doc.total_hours, week))
    })?;

    let target = match (course, def) {
        (Some(course), Some(def)) => format!(" on {}", super::label(course, def)),
        (Some(course), None) => format!(" on {}", course.name),
        _ => String::new(),
    };
    super::confirm(&format!(
        "Logged {}h{} ({}h this week, {}h total)",
        hours, target, week, total
    ));

    let description = match (course, def) {
        (Some(course), Some(def)) => format!("log {}h {} {}", hours, course.alias, def.key),
        (Some(course), None) => format!("log {}h {}", hours, course.alias),
        _ => format!("log {}h", hours),
    };
    super::record(study, clock, description, vec![change]);
    Ok(())
}
