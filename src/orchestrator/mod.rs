//! Check workflow orchestration.
//!
//! This module owns the check lifecycle (validation, busy flag, network call,
//! response interpretation) and the history it feeds. UI/CLI layers call into
//! this module to keep responsibilities separated.

mod controller;
mod post_process;
mod session;

pub use controller::{run_controller, UiCommand};
pub use session::{BusyGuard, CheckOrchestrator, PendingCheck, StatusFlag};
