//! Debug runtime facade for the adapter.

use indexmap::IndexMap;
use smol_str::SmolStr;

use xslt_runtime::debug::{RunSinks, RunStop};

use crate::protocol::{LaunchArguments, SetBreakpointsArguments, SetBreakpointsResponseBody};

/// Narrow interface the protocol adapter drives. The concrete session owns
/// the engine registry, the breakpoint store, and the single active run.
pub trait DebugRuntime: Send {
    /// Wire the channels run notifications flow through. Called once when
    /// the protocol loop starts, before any launch can happen.
    fn set_sinks(&mut self, sinks: RunSinks);

    /// Start a run from launch arguments. On success returns a one-line
    /// summary for the console; on failure an error message for the
    /// response.
    fn launch(&mut self, args: &LaunchArguments) -> Result<String, String>;

    /// Store, verify, and apply breakpoints for one source file.
    fn set_breakpoints(&mut self, args: &SetBreakpointsArguments) -> SetBreakpointsResponseBody;

    /// Run-control commands. Return false when no run is active.
    fn continue_run(&mut self) -> bool;
    fn step_over(&mut self) -> bool;
    fn step_in(&mut self) -> bool;
    fn step_out(&mut self) -> bool;

    /// Detach from the active run, releasing any pending pause.
    fn detach(&mut self);

    fn has_active_run(&self) -> bool;

    /// The most recent stop of the active run.
    fn last_stop(&self) -> Option<RunStop>;

    /// Captured variable map of the active run, in capture order.
    fn variables(&self) -> IndexMap<SmolStr, String>;

    /// Evaluate a path expression against the last stop's context node.
    fn evaluate(&self, expression: &str) -> Option<String>;
}
