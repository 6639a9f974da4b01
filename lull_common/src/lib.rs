//! # Lull Common Library
//!
//! Shared vocabulary and infrastructure for the Lull bed-control daemon:
//!
//! - [`command`] — the typed command union and voice-intent parser
//! - [`error`] — shared error types
//! - [`timer`] — monotonic clock abstraction (system + fake)
//! - [`time_source`] — zoned wall-clock abstraction (system + fake)
//! - [`settings`] — daemon-wide settings file
//! - [`report`] — per-day activity journal
//!
//! Everything here is consumed by `lull_control`, `lull_routine` and the
//! `lull` daemon binary. The core runs single-threaded inside a polling
//! loop, so shared state uses `Rc` and interior mutability, not locks.

pub mod command;
pub mod error;
pub mod report;
pub mod settings;
pub mod time_source;
pub mod timer;

pub use command::{Command, MoveDirection, RoutineAction};
pub use error::{LullError, LullResult};
pub use report::ReportManager;
pub use settings::Settings;
pub use time_source::{FakeTimeSource, TimeSource, ZonedTimeSource};
pub use timer::{Clock, FakeClock, SystemClock};
