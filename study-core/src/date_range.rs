//! Date range for the calendar sync window.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::tracker::week_start;

/// Half-open range `[from, to)` of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        DateRange { from, to }
    }

    /// From midnight on the Monday of `today`'s week, for `weeks` weeks.
    pub fn sync_window(today: NaiveDate, weeks: u32) -> Self {
        let from = week_start(today).and_time(NaiveTime::MIN);
        let to = from + Duration::weeks(weeks as i64);
        DateRange { from, to }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.from <= t && t < self.to
    }

    /// Every calendar day that starts inside the range.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from
            .date()
            .iter_days()
            .take_while(move |d| d.and_time(NaiveTime::MIN) < self.to)
            .filter(move |d| self.contains(d.and_time(NaiveTime::MIN)))
    }
}
