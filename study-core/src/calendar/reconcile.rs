//! Diffing desired events against the calendar and applying the result.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::calendar::ExternalCalendar;
use crate::calendar::event::{CalendarEvent, EventKey, RemoteEvent};
use crate::date_range::DateRange;
use crate::error::{StudyError, StudyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Create,
    Update,
    Delete,
}

impl DiffKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            DiffKind::Create => "+",
            DiffKind::Update => "~",
            DiffKind::Delete => "-",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One change to the calendar. Updates carry both sides; the calendar has
/// no update primitive, so they are applied as delete + create.
#[derive(Debug, Clone)]
pub struct EventDiff {
    pub kind: DiffKind,
    pub old: Option<RemoteEvent>,
    pub new: Option<CalendarEvent>,
}

impl fmt::Display for EventDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.summary())
    }
}

impl EventDiff {
    fn create(event: CalendarEvent) -> Self {
        EventDiff {
            kind: DiffKind::Create,
            old: None,
            new: Some(event),
        }
    }

    fn delete(event: RemoteEvent) -> Self {
        EventDiff {
            kind: DiffKind::Delete,
            old: Some(event),
            new: None,
        }
    }

    fn update(old: RemoteEvent, new: CalendarEvent) -> Self {
        EventDiff {
            kind: DiffKind::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Summary of the event (prefer new, fallback to old).
    pub fn summary(&self) -> &str {
        match (&self.new, &self.old) {
            (Some(new), _) => &new.summary,
            (None, Some(old)) => &old.summary,
            (None, None) => "",
        }
    }

    pub fn start(&self) -> Option<chrono::NaiveDateTime> {
        self.new
            .as_ref()
            .map(|e| e.start)
            .or(self.old.as_ref().map(|e| e.start))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Touch only what differs.
    #[default]
    Diff,
    /// Delete every managed event in the window and recreate.
    Regen,
}

/// The changes needed to bring the calendar in line, sorted by start time.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub window: DateRange,
    pub changes: Vec<EventDiff>,
    pub unchanged: usize,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, kind: DiffKind) -> usize {
        self.changes.iter().filter(|d| d.kind == kind).count()
    }

    /// Match existing managed events to desired ones by identity key.
    ///
    /// - key matches and content is equal: left alone
    /// - key matches, content differs: update
    /// - desired only: create
    /// - existing only, duplicate key, or legacy event with no key: delete
    pub fn diff(desired: Vec<CalendarEvent>, existing: Vec<RemoteEvent>, window: DateRange) -> Self {
        let desired_by_key: HashMap<EventKey, CalendarEvent> = desired
            .iter()
            .map(|e| (e.key.clone(), e.clone()))
            .collect();

        let managed = managed_in_window(existing, &window);

        // Group existing events by key, keeping an exact match first so a
        // duplicate never displaces a correct event.
        let mut by_key: HashMap<EventKey, Vec<RemoteEvent>> = HashMap::new();
        let mut changes = Vec::new();
        for remote in managed {
            match remote.key() {
                Some(key) => by_key.entry(key).or_default().push(remote),
                None => {
                    debug!(summary = %remote.summary, "Removing legacy event without identity");
                    changes.push(EventDiff::delete(remote));
                }
            }
        }

        let mut unchanged = 0;
        let mut matched: HashSet<EventKey> = HashSet::new();
        for (key, mut remotes) in by_key {
            let Some(wanted) = desired_by_key.get(&key) else {
                changes.extend(remotes.into_iter().map(EventDiff::delete));
                continue;
            };

            if let Some(pos) = remotes.iter().position(|r| r.matches(wanted)) {
                remotes.swap(0, pos);
            }
            let mut remotes = remotes.into_iter();
            if let Some(keeper) = remotes.next() {
                if keeper.matches(wanted) {
                    unchanged += 1;
                } else {
                    changes.push(EventDiff::update(keeper, wanted.clone()));
                }
                matched.insert(key);
            }
            changes.extend(remotes.map(EventDiff::delete));
        }

        changes.extend(
            desired
                .into_iter()
                .filter(|e| !matched.contains(&e.key))
                .map(EventDiff::create),
        );

        sort_changes(&mut changes);
        SyncPlan {
            window,
            changes,
            unchanged,
        }
    }

    /// Delete everything managed in the window, then create everything desired.
    pub fn regen(desired: Vec<CalendarEvent>, existing: Vec<RemoteEvent>, window: DateRange) -> Self {
        let mut changes: Vec<EventDiff> = managed_in_window(existing, &window)
            .into_iter()
            .map(EventDiff::delete)
            .collect();
        sort_changes(&mut changes);

        let mut creates: Vec<EventDiff> = desired.into_iter().map(EventDiff::create).collect();
        sort_changes(&mut creates);
        changes.extend(creates);

        SyncPlan {
            window,
            changes,
            unchanged: 0,
        }
    }
}

fn managed_in_window(existing: Vec<RemoteEvent>, window: &DateRange) -> Vec<RemoteEvent> {
    existing
        .into_iter()
        .filter(|e| e.is_managed() && window.contains(e.start))
        .collect()
}

fn sort_changes(changes: &mut [EventDiff]) {
    changes.sort_by(|a, b| {
        (a.start(), a.summary()).cmp(&(b.start(), b.summary()))
    });
}

#[derive(Debug, Clone)]
pub struct SyncFailure {
    pub kind: DiffKind,
    pub summary: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Attempts per calendar call, with a linearly growing pause between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> StudyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StudyResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let pause = self.delay * attempt;
                    warn!(what, attempt, error = %e, "Calendar call failed, retrying");
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Drives a sync against one named calendar.
pub struct Reconciler<'a, C: ExternalCalendar> {
    calendar: &'a C,
    calendar_name: String,
    retry: RetryPolicy,
}

impl<'a, C: ExternalCalendar> Reconciler<'a, C> {
    pub fn new(calendar: &'a C, calendar_name: impl Into<String>, retry: RetryPolicy) -> Self {
        Reconciler {
            calendar,
            calendar_name: calendar_name.into(),
            retry,
        }
    }

    /// List the window and work out what to change. Nothing is mutated.
    pub async fn plan(
        &self,
        desired: Vec<CalendarEvent>,
        window: DateRange,
        mode: SyncMode,
    ) -> StudyResult<SyncPlan> {
        let existing = self
            .retry
            .run("list", || self.calendar.list_events(&self.calendar_name, &window))
            .await
            .map_err(|e| match e {
                StudyError::CalendarUnavailable(_) => e,
                other => StudyError::CalendarUnavailable(other.to_string()),
            })?;
        debug!(count = existing.len(), "Listed calendar events");

        Ok(match mode {
            SyncMode::Diff => SyncPlan::diff(desired, existing, window),
            SyncMode::Regen => SyncPlan::regen(desired, existing, window),
        })
    }

    /// Apply every change, recording failures instead of stopping at the
    /// first one.
    pub async fn apply(&self, plan: &SyncPlan) -> SyncReport {
        let mut report = SyncReport {
            unchanged: plan.unchanged,
            ..SyncReport::default()
        };

        for diff in &plan.changes {
            let result = match (diff.kind, &diff.old, &diff.new) {
                (DiffKind::Create, _, Some(new)) => self.create(new).await,
                (DiffKind::Delete, Some(old), _) => self.delete(old).await,
                (DiffKind::Update, Some(old), Some(new)) => {
                    // A failed delete skips the create so the event is not doubled.
                    match self.delete(old).await {
                        Ok(()) => self.create(new).await,
                        Err(e) => Err(e),
                    }
                }
                _ => Ok(()),
            };

            match result {
                Ok(()) => match diff.kind {
                    DiffKind::Create => report.created += 1,
                    DiffKind::Update => report.updated += 1,
                    DiffKind::Delete => report.deleted += 1,
                },
                Err(e) => {
                    warn!(summary = diff.summary(), kind = %diff.kind, error = %e, "Calendar change failed");
                    report.failures.push(SyncFailure {
                        kind: diff.kind,
                        summary: diff.summary().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "Calendar sync finished"
        );
        report
    }

    pub async fn sync(
        &self,
        desired: Vec<CalendarEvent>,
        window: DateRange,
        mode: SyncMode,
    ) -> StudyResult<SyncReport> {
        let plan = self.plan(desired, window, mode).await?;
        Ok(self.apply(&plan).await)
    }

    async fn create(&self, event: &CalendarEvent) -> StudyResult<()> {
        self.retry
            .run("create", || self.calendar.create_event(&self.calendar_name, event))
            .await
            .map(|_| ())
    }

    async fn delete(&self, event: &RemoteEvent) -> StudyResult<()> {
        self.retry
            .run("delete", || self.calendar.delete_event(&event.id))
            .await
    }
}
