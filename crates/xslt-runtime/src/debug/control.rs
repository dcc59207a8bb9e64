//! Debug run control: breakpoints, stepping, call depth, pausing.
//!
//! One `DebugControl` exists per execution run. Probe callbacks enter it
//! from the transform worker; debug commands enter it from the protocol
//! thread. A single mutex guards step mode, call depth, the breakpoint
//! snapshot, and the active pause gate, so breakpoint/step evaluation for
//! one probe happens-before the next probe can fire.

use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::debug::gate::ResumeGate;
use crate::debug::types::{RunStop, StopReason};
use crate::engine::ProbeMarker;
use crate::node::NodeHandle;
use crate::paths::normalize_path;

/// Pending step request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Into,
    Over,
    Out,
}

#[derive(Debug, Clone)]
struct StepRequest {
    mode: StepMode,
    /// Depth bound captured when the request was issued.
    target_depth: u32,
    /// Location the step was issued from; a step never re-stops there.
    origin: Option<(String, u32)>,
}

#[derive(Debug, Default)]
struct ControlState {
    /// Normalized path of the stylesheet this run executes.
    file: String,
    /// Normalized path → breakpoint lines, replaced wholesale per file.
    breakpoints: HashMap<String, BTreeSet<u32>>,
    step: Option<StepRequest>,
    call_depth: u32,
    entry_pause: bool,
    detached: bool,
    gate: Option<Arc<ResumeGate>>,
    variables: IndexMap<SmolStr, String>,
    stop_tx: Option<Sender<RunStop>>,
    last_stop: Option<RunStop>,
}

impl ControlState {
    fn breakpoint_hit(&self, line: u32) -> bool {
        self.breakpoints
            .get(&self.file)
            .is_some_and(|lines| lines.contains(&line))
    }
}

/// Shared control handle, clonable across the worker and command threads.
#[derive(Debug, Clone, Default)]
pub struct DebugControl {
    state: Arc<Mutex<ControlState>>,
}

impl DebugControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a new run over `file`: clears step state, call depth,
    /// captured variables, and the detach flag. Breakpoints survive so the
    /// snapshot applied before launch stays in force.
    pub fn reset_for_run(&self, file: &str) {
        let mut state = self.lock();
        state.file = normalize_path(file);
        state.step = None;
        state.call_depth = 0;
        state.entry_pause = false;
        state.detached = false;
        state.gate = None;
        state.variables.clear();
        state.last_stop = None;
    }

    /// Replace the breakpoint set for one file.
    pub fn set_breakpoints(&self, file: &str, lines: BTreeSet<u32>) {
        let mut state = self.lock();
        state.breakpoints.insert(normalize_path(file), lines);
    }

    /// Stream stop notifications to `sender`.
    pub fn set_stop_sender(&self, sender: Sender<RunStop>) {
        self.lock().stop_tx = Some(sender);
    }

    pub fn clear_stop_sender(&self) {
        self.lock().stop_tx = None;
    }

    /// Arrange a pause at the first probe of the run.
    pub fn request_entry_pause(&self) {
        self.lock().entry_pause = true;
    }

    /// Resume without a step request.
    pub fn continue_run(&self) {
        self.command(|_| None);
    }

    pub fn step_in(&self) {
        self.command(|state| {
            Some(StepRequest {
                mode: StepMode::Into,
                target_depth: state.call_depth,
                origin: origin_of(state),
            })
        });
    }

    pub fn step_over(&self) {
        self.command(|state| {
            Some(StepRequest {
                mode: StepMode::Over,
                target_depth: state.call_depth,
                origin: origin_of(state),
            })
        });
    }

    pub fn step_out(&self) {
        self.command(|state| {
            Some(StepRequest {
                mode: StepMode::Out,
                target_depth: state.call_depth.saturating_sub(1),
                origin: origin_of(state),
            })
        });
    }

    /// Detach the session: no further stops are reported and any pending
    /// pause is released so the run can drain to completion.
    pub fn detach(&self) {
        let gate = {
            let mut state = self.lock();
            state.detached = true;
            state.step = None;
            state.entry_pause = false;
            state.gate.take()
        };
        if let Some(gate) = gate {
            gate.release();
        }
    }

    /// Record a traced variable value for the current run.
    pub fn record_variable(&self, name: &str, value: &str) {
        let mut state = self.lock();
        state.variables.insert(SmolStr::new(name), value.to_string());
    }

    /// Snapshot of the captured variable map, in capture order.
    #[must_use]
    pub fn variables(&self) -> IndexMap<SmolStr, String> {
        self.lock().variables.clone()
    }

    /// The most recent stop, if the run has paused at least once.
    #[must_use]
    pub fn last_stop(&self) -> Option<RunStop> {
        self.lock().last_stop.clone()
    }

    /// Whether the worker is currently blocked in a pause gate.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock().gate.is_some()
    }

    /// Call depth as last observed by the worker.
    #[must_use]
    pub fn call_depth(&self) -> u32 {
        self.lock().call_depth
    }

    /// Probe entry point, called from the transform worker only. Applies
    /// depth bookkeeping, decides whether to pause, and if so blocks the
    /// worker until a debug command releases the gate.
    pub fn on_probe(&self, line: u32, marker: Option<ProbeMarker>, node: Option<NodeHandle>) {
        let gate = {
            let mut state = self.lock();
            match marker {
                Some(ProbeMarker::ScopeEntry) => state.call_depth += 1,
                Some(ProbeMarker::ScopeExit) => {
                    state.call_depth = state.call_depth.saturating_sub(1);
                }
                None => {}
            }
            if state.detached {
                return;
            }

            let is_exit = marker == Some(ProbeMarker::ScopeExit);
            let depth = state.call_depth;
            let reason = if state.entry_pause {
                state.entry_pause = false;
                Some(StopReason::EntryPause)
            } else if !is_exit && state.breakpoint_hit(line) {
                // Exit probes reuse their scope's header line and are never
                // treated as user breakpoint hits.
                Some(StopReason::Breakpoint)
            } else if let Some(step) = &state.step {
                let stop = match step.mode {
                    StepMode::Into => !is_exit,
                    StepMode::Over => {
                        !is_exit
                            && depth <= step.target_depth
                            && !is_origin(step, &state.file, line)
                    }
                    StepMode::Out => depth <= step.target_depth,
                };
                stop.then_some(StopReason::Step)
            } else {
                None
            };

            let Some(reason) = reason else {
                return;
            };
            state.step = None;
            let stop = RunStop {
                file: state.file.clone(),
                line,
                reason,
                node,
                depth,
            };
            tracing::debug!(line, ?reason, depth, "pausing worker");
            state.last_stop = Some(stop.clone());
            let gate = Arc::new(ResumeGate::new());
            state.gate = Some(Arc::clone(&gate));
            if let Some(sender) = &state.stop_tx {
                let _ = sender.send(stop);
            }
            gate
        };
        gate.wait();
    }

    fn command(&self, make: impl FnOnce(&ControlState) -> Option<StepRequest>) {
        let gate = {
            let mut state = self.lock();
            let step = make(&state);
            state.step = step;
            state.gate.take()
        };
        if let Some(gate) = gate {
            gate.release();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControlState> {
        self.state.lock().expect("debug control poisoned")
    }
}

fn origin_of(state: &ControlState) -> Option<(String, u32)> {
    state
        .last_stop
        .as_ref()
        .map(|stop| (stop.file.clone(), stop.line))
}

fn is_origin(step: &StepRequest, file: &str, line: u32) -> bool {
    step.origin
        .as_ref()
        .is_some_and(|(origin_file, origin_line)| origin_file == file && *origin_line == line)
}
