//! # Lull Control Library
//!
//! The actuator control core of the Lull bed daemon:
//!
//! - [`gpio`] — exclusive ownership of GPIO output lines, with a live
//!   character-device backend (feature `hardware`) and a bookkeeping-only
//!   simulation backend
//! - [`control`] — the per-actuator finite-state machine
//! - [`config`] — the persisted control configuration record
//! - [`manager`] — the collection of controls, keyed by name
//!
//! The whole core is single-threaded and poll-driven: nothing here
//! blocks, and every timing decision is "now minus recorded stamp"
//! against an injected [`lull_common::Clock`].

pub mod config;
pub mod control;
pub mod gpio;
pub mod manager;

pub use config::ControlConfig;
pub use control::{Control, ControlState};
pub use gpio::{Backend, LineRegistry};
pub use manager::ControlManager;
