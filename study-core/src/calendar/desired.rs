//! The events the calendar should contain, derived from the catalog and the
//! tracker document.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use tracing::warn;

use crate::calendar::event::{CalendarEvent, EventCategory, EventKey};
use crate::catalog::{Catalog, StudyBlock};
use crate::date_range::DateRange;
use crate::deadlines::{self, DeadlineEntry};
use crate::status::Status;
use crate::tracker::TrackerDocument;

/// Deadlines without an explicit time are due at four in the afternoon.
const DEFAULT_DUE_TIME: (u32, u32) = (16, 0);
const EXAM_START: (u32, u32) = (9, 0);
const EXAM_END: (u32, u32) = (17, 0);

fn at(date: NaiveDate, (h, m): (u32, u32)) -> chrono::NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN))
}

/// Title prefix for a deadline or exam in its current state.
fn title_prefix(entry: &DeadlineEntry) -> &'static str {
    match (entry.category, entry.effective) {
        (_, Status::Submitted) => "SUBMITTED:",
        (_, Status::Completed) => "DONE:",
        (EventCategory::Exam, _) => "EXAM:",
        (_, Status::Overdue) => "OVERDUE:",
        _ => "DEADLINE:",
    }
}

fn deadline_event(catalog: &Catalog, entry: &DeadlineEntry) -> CalendarEvent {
    let key = EventKey {
        category: entry.category,
        course: Some(entry.course_code.clone()),
        item: entry.key.clone(),
        date: entry.date,
    };

    let (start, end) = match entry.category {
        EventCategory::Exam => (at(entry.date, EXAM_START), at(entry.end_date, EXAM_END)),
        _ => {
            let due_time = catalog
                .assessment(&entry.course_code, &entry.key)
                .and_then(|def| def.due_time)
                .map(|t| t.0)
                .unwrap_or_else(|| {
                    NaiveTime::from_hms_opt(DEFAULT_DUE_TIME.0, DEFAULT_DUE_TIME.1, 0)
                        .unwrap_or(NaiveTime::MIN)
                });
            let end = entry.date.and_time(due_time);
            (end - Duration::hours(1), end)
        }
    };

    let mut body = vec![entry.course_name.clone(), entry.name.clone()];
    if let Some(weight) = &entry.weight {
        body.push(format!("Weight: {weight}"));
    }
    body.push(format!("Status: {}", entry.effective));

    CalendarEvent::new(
        key,
        format!("{} [{}] {}", title_prefix(entry), entry.course_alias, entry.name),
        start,
        end,
        &body.join("\n"),
    )
}

fn study_event(catalog: &Catalog, block: &StudyBlock, date: NaiveDate) -> CalendarEvent {
    let course = block
        .course
        .as_deref()
        .and_then(|c| catalog.course_for_alias_or_code(c))
        .map(|c| c.code.clone());

    let key = EventKey {
        category: EventCategory::Study,
        course,
        item: format!("{}-{}", slug::slugify(&block.title), block.start.0.format("%H%M")),
        date,
    };

    CalendarEvent::new(
        key,
        block.title.clone(),
        date.and_time(block.start.0),
        date.and_time(block.end.0),
        &block.description,
    )
}

/// Every managed event that should exist in `window`, soonest first.
///
/// Ongoing assessments and those without a date get no deadline event.
/// Finished work keeps its event, retitled, so the calendar shows progress.
pub fn desired_events(
    catalog: &Catalog,
    doc: &TrackerDocument,
    window: &DateRange,
    today: NaiveDate,
) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = deadlines::summary(catalog, doc, today)
        .iter()
        .filter(|entry| entry.status != Status::Ongoing)
        .map(|entry| deadline_event(catalog, entry))
        .filter(|event| window.contains(event.start))
        .collect();

    for date in window.days() {
        for block in catalog.schedule.iter().filter(|b| b.day == date.weekday()) {
            events.push(study_event(catalog, block, date));
        }
    }

    let mut seen = HashSet::new();
    events.retain(|event| {
        let fresh = seen.insert(event.key.clone());
        if !fresh {
            warn!(key = %event.key, "Dropping duplicate calendar event");
        }
        fresh
    });

    events.sort_by(|a, b| (a.start, &a.key).cmp(&(b.start, &b.key)));
    events
}
