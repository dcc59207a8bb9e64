//! Debug run data types.

use std::sync::mpsc::Sender;

use crate::node::NodeHandle;

/// Why a run paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A user breakpoint on the stopped line.
    Breakpoint,
    /// A step request completed.
    Step,
    /// Stop-on-entry pause at the first probe of the run.
    EntryPause,
}

/// Notification emitted when the worker pauses.
#[derive(Debug, Clone)]
pub struct RunStop {
    /// Normalized stylesheet path.
    pub file: String,
    /// 1-based stylesheet line.
    pub line: u32,
    pub reason: StopReason,
    /// Snapshot of the current node, when conversion succeeded.
    pub node: Option<NodeHandle>,
    /// Call depth observed at the stop.
    pub depth: u32,
}

/// Free-text output forwarded to the client.
#[derive(Debug, Clone)]
pub struct RunLog {
    pub message: String,
    pub category: LogCategory,
}

/// Coarse category used for verbosity gating and client routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogCategory {
    /// Engine progress and diagnostics.
    Log,
    /// Variable and position traces.
    Trace,
    /// Per-probe chatter.
    TraceAll,
    /// Transform result and fatal reports, always emitted.
    Output,
}

/// How much diagnostic output a run emits. `None` also disables
/// instrumentation entirely so the transform runs at full speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    None,
    #[default]
    Log,
    Trace,
    TraceAll,
}

impl Verbosity {
    /// Parse the launch-time string form. Unknown values fall back to `Log`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "none" => Verbosity::None,
            "trace" => Verbosity::Trace,
            "traceall" | "trace-all" => Verbosity::TraceAll,
            _ => Verbosity::Log,
        }
    }

    /// Whether a message of `category` passes this verbosity level.
    #[must_use]
    pub fn admits(self, category: LogCategory) -> bool {
        match category {
            LogCategory::Output => true,
            LogCategory::Log => self >= Verbosity::Log,
            LogCategory::Trace => self >= Verbosity::Trace,
            LogCategory::TraceAll => self >= Verbosity::TraceAll,
        }
    }
}

/// Channels a run reports through. Cloned into the worker and the probe
/// callbacks; receivers live with the protocol server.
#[derive(Debug, Clone)]
pub struct RunSinks {
    pub log_tx: Sender<RunLog>,
    pub stop_tx: Sender<RunStop>,
    /// Exactly one exit code is sent per run.
    pub term_tx: Sender<i32>,
}

impl RunSinks {
    pub fn log(&self, verbosity: Verbosity, category: LogCategory, message: impl Into<String>) {
        if verbosity.admits(category) {
            let _ = self.log_tx.send(RunLog {
                message: message.into(),
                category,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_gates_by_category() {
        assert!(Verbosity::None.admits(LogCategory::Output));
        assert!(!Verbosity::None.admits(LogCategory::Log));
        assert!(Verbosity::Log.admits(LogCategory::Log));
        assert!(!Verbosity::Log.admits(LogCategory::Trace));
        assert!(Verbosity::TraceAll.admits(LogCategory::TraceAll));
        assert_eq!(Verbosity::parse("TraceAll"), Verbosity::TraceAll);
        assert_eq!(Verbosity::parse("bogus"), Verbosity::Log);
    }
}
