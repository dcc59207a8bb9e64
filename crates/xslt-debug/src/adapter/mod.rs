//! Debug adapter module map.
//! - core: protocol loop, dispatch, event helpers
//! - handlers: DAP request handlers by area
//! - variables: lazy variable tree + evaluate
//! - stop: stop/termination event forwarding
//! - protocol_io: message framing + transcript logging
//! - tests: adapter unit tests

mod core;
mod handlers;
mod protocol_io;
mod stop;
mod variables;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use serde_json::Value;

use xslt_runtime::NodeHandle;

use crate::protocol::{LaunchArguments, Request};
use crate::runtime::DebugRuntime;

/// Lazily expanded variable-tree handles. The registry maps opaque integer
/// references to producers; it is rebuilt on every `scopes` request and
/// discarded with it, never persisted across stops.
#[derive(Debug, Clone)]
enum VariableHandle {
    /// Structural fields of a node: name, kind, value, position.
    Context(NodeHandle),
    /// Attribute list of a node.
    Attributes(NodeHandle),
    /// Child list of a node.
    Children(NodeHandle),
    /// Captured name/value trace map of the active run.
    Variables,
}

/// Launch requests queue until the client signals `configurationDone`.
enum LaunchState {
    AwaitingConfig {
        pending: Option<(Request<Value>, LaunchArguments)>,
    },
    Configured,
}

impl Default for LaunchState {
    fn default() -> Self {
        Self::AwaitingConfig { pending: None }
    }
}

impl LaunchState {
    fn is_configured(&self) -> bool {
        matches!(self, Self::Configured)
    }

    fn set_pending(&mut self, request: Request<Value>, args: LaunchArguments) {
        *self = Self::AwaitingConfig {
            pending: Some((request, args)),
        };
    }

    fn take_pending(&mut self) -> Option<(Request<Value>, LaunchArguments)> {
        match self {
            Self::AwaitingConfig { pending } => pending.take(),
            Self::Configured => None,
        }
    }

    fn set_configured(&mut self) {
        *self = Self::Configured;
    }
}

/// Protocol adapter wrapping a debug session.
pub struct DebugAdapter {
    session: Box<dyn DebugRuntime>,
    next_seq: Arc<AtomicU32>,
    variable_handles: HashMap<u32, VariableHandle>,
    next_variable_ref: u32,
    launch_state: LaunchState,
}

/// Everything one dispatched request produced.
#[derive(Debug, Default)]
struct DispatchOutcome {
    responses: Vec<Value>,
    events: Vec<Value>,
    should_exit: bool,
}
