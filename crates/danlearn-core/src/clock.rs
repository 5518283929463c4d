//! # Clock
//!
//! Time source for the CORE.
//!
//! The core never reads the wall clock directly. Every operation that needs
//! "now" or "today" receives a [`Clock`], so day rollover is testable and the
//! reference timezone is an explicit configuration value.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::Mutex;

/// A source of the current instant and the reference timezone.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the reference timezone used for calendar days.
    fn offset(&self) -> FixedOffset;

    /// The current calendar day in the reference timezone.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

/// Wall clock with a fixed reference offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Wall clock with calendar days at the given offset east of UTC.
    ///
    /// Offsets outside +/- 24h fall back to UTC.
    #[must_use]
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or(Utc.fix());
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Create a manual clock at the given instant, with UTC calendar days.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            offset: Utc.fix(),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(at("2026-03-01T23:30:00Z"));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"));

        clock.advance(Duration::hours(1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"));
    }

    #[test]
    fn system_clock_uses_configured_offset() {
        let clock = SystemClock::with_offset_minutes(-90);
        assert_eq!(clock.offset().local_minus_utc(), -90 * 60);
        let local = Utc::now().with_timezone(&clock.offset()).date_naive();
        // tolerate a day boundary between the two reads
        assert!(clock.today() >= local);
    }

    #[test]
    fn system_clock_rejects_absurd_offset() {
        let clock = SystemClock::with_offset_minutes(60 * 48);
        assert_eq!(clock.offset().local_minus_utc(), 0);
    }
}
