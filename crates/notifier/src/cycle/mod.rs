//! Poll cycle engine
//!
//! Runs one watermark-based incremental fetch per invocation and
//! dispatches a notification for each new message.

mod engine;
mod lease;
mod report;
pub mod watermark;

pub use engine::{CycleOptions, PollCycle};
pub use lease::LeaseGuard;
pub use report::{CycleReport, FailedDispatch};
pub use watermark::{DispatchOutcome, advance, is_new, select_new};
