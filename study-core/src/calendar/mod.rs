//! Calendar reconciliation.
//!
//! The tracker owns a set of events in one external calendar: deadlines,
//! exam windows and the weekly study template. Syncing compares what should
//! be there with what is there and applies the difference, so repeated syncs
//! converge instead of piling up duplicates.

mod desired;
mod event;
mod memory;
mod reconcile;
mod script;

pub use desired::desired_events;
pub use event::{
    CalendarEvent, DEADLINE_REMINDERS, EventCategory, EventId, EventKey, LEGACY_PREFIXES,
    MARKER_PREFIX, RemoteEvent,
};
pub use memory::MemoryCalendar;
pub use reconcile::{
    DiffKind, EventDiff, Reconciler, RetryPolicy, SyncFailure, SyncMode, SyncPlan, SyncReport,
};
pub use script::ScriptCalendar;

use crate::date_range::DateRange;
use crate::error::StudyResult;

/// The three operations the tracker needs from a calendar.
#[allow(async_fn_in_trait)]
pub trait ExternalCalendar {
    /// Events in `calendar` starting inside `range`.
    async fn list_events(&self, calendar: &str, range: &DateRange) -> StudyResult<Vec<RemoteEvent>>;

    async fn create_event(&self, calendar: &str, event: &CalendarEvent) -> StudyResult<EventId>;

    async fn delete_event(&self, id: &EventId) -> StudyResult<()>;
}
