//! Time source. Everything date-dependent reads the clock through this trait
//! so tests can pin "now".

use std::cell::Cell;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

pub trait Clock {
    /// Local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        FixedClock {
            now: Cell::new(now),
        }
    }

    #[cfg(test)]
    pub(crate) fn at(s: &str) -> Self {
        let now = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .unwrap_or_else(|e| panic!("bad timestamp '{s}': {e}"));
        Self::new(now)
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at("2026-10-17T09:30:00");
        clock.advance(Duration::days(1));
        assert_eq!(clock.today().to_string(), "2026-10-18");
    }
}
