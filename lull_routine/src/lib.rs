//! User-defined action sequences.
//!
//! A routine is a named list of steps, each of which drives a control
//! in some direction after a delay. Routines are described by `.rtn`
//! JSON files and may loop until stopped.

pub mod desc;
pub mod manager;
pub mod routine;

pub use desc::{RoutineDesc, Step, bootstrap_routines};
pub use manager::RoutineManager;
pub use routine::Routine;
