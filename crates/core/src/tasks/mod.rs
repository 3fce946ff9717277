//! Contact and call task automation

pub mod ports;
pub mod state_machine;

pub use state_machine::{CallAttemptOutcome, CallResetOutcome, TaskStateMachine};
