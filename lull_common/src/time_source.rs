//! Zoned wall-clock abstraction.
//!
//! Only the report journal cares about wall-clock time; it needs it in
//! the configured IANA zone so day boundaries land where the user
//! sleeps, not at UTC midnight. The fake variant lets report tests pin
//! the clock to an exact moment.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{LullError, LullResult};

/// A source of the current zoned wall-clock time.
pub trait TimeSource {
    /// The current time in the source's zone.
    fn now(&self) -> DateTime<Tz>;
}

/// OS-backed time source with a fixed IANA zone.
#[derive(Debug, Clone)]
pub struct ZonedTimeSource {
    tz: Tz,
}

impl ZonedTimeSource {
    /// Create a source for a zone name, e.g. "America/Chicago".
    ///
    /// Fails when the name is not a known IANA zone.
    pub fn new(time_zone_name: &str) -> LullResult<Self> {
        let tz: Tz = time_zone_name
            .parse()
            .map_err(|_| LullError::UnknownTimeZone {
                name: time_zone_name.to_owned(),
            })?;
        Ok(Self { tz })
    }
}

impl TimeSource for ZonedTimeSource {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Settable time source for deterministic tests.
#[derive(Debug)]
pub struct FakeTimeSource {
    now: RefCell<DateTime<Tz>>,
}

impl FakeTimeSource {
    /// Create a fake source pinned to the given moment.
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: RefCell::new(now),
        }
    }

    /// Move the source to a new moment.
    pub fn set_now(&self, now: DateTime<Tz>) {
        *self.now.borrow_mut() = now;
    }
}

impl TimeSource for FakeTimeSource {
    fn now(&self) -> DateTime<Tz> {
        *self.now.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zone_names_are_validated() {
        assert!(ZonedTimeSource::new("America/Chicago").is_ok());
        assert!(ZonedTimeSource::new("Not/AZone").is_err());
        assert!(ZonedTimeSource::new("").is_err());
    }

    #[test]
    fn fake_source_returns_what_was_set() {
        let tz: Tz = "America/Chicago".parse().unwrap();
        let first = tz.with_ymd_and_hms(2025, 9, 28, 16, 59, 59).unwrap();
        let source = FakeTimeSource::new(first);
        assert_eq!(source.now(), first);

        let second = tz.with_ymd_and_hms(2025, 9, 28, 17, 0, 0).unwrap();
        source.set_now(second);
        assert_eq!(source.now(), second);
    }
}
