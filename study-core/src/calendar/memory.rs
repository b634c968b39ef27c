//! In-memory calendar. Counts every mutation and can be told to fail, which
//! makes it the stand-in for a real calendar when exercising the reconciler.

use std::cell::RefCell;

use crate::calendar::ExternalCalendar;
use crate::calendar::event::{CalendarEvent, EventId, RemoteEvent};
use crate::date_range::DateRange;
use crate::error::{StudyError, StudyResult};

#[derive(Default)]
pub struct MemoryCalendar {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    events: Vec<(String, RemoteEvent)>,
    next_id: u64,
    creates: usize,
    deletes: usize,
    fail_next: u32,
    unavailable: bool,
    rejected: Vec<String>,
}

impl State {
    fn issue_id(&mut self) -> EventId {
        self.next_id += 1;
        EventId(format!("mem-{}", self.next_id))
    }
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event without counting it as a mutation. The id is assigned here.
    pub fn insert(&self, calendar: &str, mut event: RemoteEvent) -> EventId {
        let mut state = self.state.borrow_mut();
        event.id = state.issue_id();
        let id = event.id.clone();
        state.events.push((calendar.to_string(), event));
        id
    }

    pub fn insert_desired(&self, calendar: &str, event: &CalendarEvent) -> EventId {
        self.insert(calendar, to_remote(EventId(String::new()), event))
    }

    pub fn events(&self, calendar: &str) -> Vec<RemoteEvent> {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|(cal, _)| cal == calendar)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn len(&self, calendar: &str) -> usize {
        self.events(calendar).len()
    }

    pub fn is_empty(&self, calendar: &str) -> bool {
        self.len(calendar) == 0
    }

    /// Creates plus deletes made through the trait.
    pub fn mutations(&self) -> usize {
        let state = self.state.borrow();
        state.creates + state.deletes
    }

    /// The next `n` calls time out.
    pub fn fail_next(&self, n: u32) {
        self.state.borrow_mut().fail_next = n;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }

    /// Creating an event whose summary contains `needle` is rejected.
    pub fn reject_summaries_containing(&self, needle: &str) {
        self.state.borrow_mut().rejected.push(needle.to_string());
    }

    fn check(&self) -> StudyResult<()> {
        let mut state = self.state.borrow_mut();
        if state.unavailable {
            return Err(StudyError::CalendarUnavailable("calendar is offline".into()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(StudyError::CalendarTimeout(0));
        }
        Ok(())
    }
}

fn to_remote(id: EventId, event: &CalendarEvent) -> RemoteEvent {
    RemoteEvent {
        id,
        summary: event.summary.clone(),
        start: event.start,
        end: event.end,
        description: event.description.clone(),
        reminders: event.reminders.clone(),
    }
}

impl ExternalCalendar for MemoryCalendar {
    async fn list_events(&self, calendar: &str, range: &DateRange) -> StudyResult<Vec<RemoteEvent>> {
        self.check()?;
        let mut events: Vec<RemoteEvent> = self
            .events(calendar)
            .into_iter()
            .filter(|e| range.contains(e.start))
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn create_event(&self, calendar: &str, event: &CalendarEvent) -> StudyResult<EventId> {
        self.check()?;
        let mut state = self.state.borrow_mut();

        if state.rejected.iter().any(|n| event.summary.contains(n.as_str())) {
            return Err(StudyError::CalendarEvent {
                summary: event.summary.clone(),
                reason: "rejected by calendar".into(),
            });
        }

        let id = state.issue_id();
        state
            .events
            .push((calendar.to_string(), to_remote(id.clone(), event)));
        state.creates += 1;
        Ok(id)
    }

    async fn delete_event(&self, id: &EventId) -> StudyResult<()> {
        self.check()?;
        let mut state = self.state.borrow_mut();

        let before = state.events.len();
        state.events.retain(|(_, e)| &e.id != id);
        if state.events.len() == before {
            return Err(StudyError::CalendarEvent {
                summary: id.to_string(),
                reason: "no such event".into(),
            });
        }
        state.deletes += 1;
        Ok(())
    }
}
