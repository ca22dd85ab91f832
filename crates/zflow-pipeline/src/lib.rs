//! Per-workspace turn pipeline: user message in, chat reply and regenerated
//! files out, one combined write at the end.

pub mod dispatcher;
pub mod error;
mod steps;

pub use dispatcher::{Dispatcher, TurnOutcome};
pub use error::PipelineError;
