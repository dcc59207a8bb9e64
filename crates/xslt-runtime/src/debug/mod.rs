//! Debugging and run control support.

mod control;
mod gate;
mod types;

pub use control::{DebugControl, StepMode};
pub use gate::ResumeGate;
pub use types::{LogCategory, RunLog, RunSinks, RunStop, StopReason, Verbosity};
