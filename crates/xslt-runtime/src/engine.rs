//! Engine collaborator contract.
//!
//! The transformation engines themselves live outside this workspace. An
//! engine only has to compile a stylesheet, resolve the registered probe
//! callbacks while it runs, and finish with output or diagnostics; all
//! debugger semantics stay on this side of the boundary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use xslt_sheet::Dialect;

use crate::error::{CompileDiagnostic, EngineError};

/// Marker distinguishing synthetic scope probes from plain break probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMarker {
    /// Entering a named template or function body.
    ScopeEntry,
    /// Leaving a named template or function body.
    ScopeExit,
}

/// Engine-native view of the current node at a probe point. Implementations
/// wrap whatever tree the engine evaluates against; the debugger only pulls
/// out what it needs to re-locate the node in its own parse of the input.
pub trait EngineNode: Send {
    /// Absolute position of the node, e.g. `/catalog[1]/item[2]`.
    fn absolute_path(&self) -> Option<String>;
    /// Element or attribute name, if the node has one.
    fn name(&self) -> Option<String>;
    /// String value of the node.
    fn string_value(&self) -> String;
    /// Node kind keyword: `element`, `attribute`, `text`, `document`, ...
    fn node_kind(&self) -> &str;
}

/// Callbacks the rewritten stylesheet resolves against during execution.
/// Every callback must tolerate being invoked from the engine's own thread
/// and must never panic back across the boundary.
#[derive(Clone)]
pub struct EngineCallbacks {
    /// `break`/`enter`/`leave` probes: line, current node, scope marker.
    pub on_probe: Arc<dyn Fn(u32, Option<Box<dyn EngineNode>>, Option<ProbeMarker>) + Send + Sync>,
    /// Iteration-position trace: line, 1-based position.
    pub on_position: Arc<dyn Fn(u32, u32) + Send + Sync>,
    /// Variable trace: name, stringified value.
    pub on_trace: Arc<dyn Fn(&str, &str) + Send + Sync>,
    /// Free-text diagnostic stream (message instructions, engine progress).
    pub on_message: Arc<dyn Fn(&str) + Send + Sync>,
}

/// One compiled/executable engine instance. An instance is single-use: it
/// compiles one stylesheet and runs it once on a worker thread.
pub trait TransformEngine: Send {
    /// Grammar version family this engine executes.
    fn dialect(&self) -> Dialect;

    /// Compile stylesheet text. `base_dir` anchors relative includes.
    fn compile(&mut self, stylesheet: &str, base_dir: &Path)
        -> Result<(), Vec<CompileDiagnostic>>;

    /// Register the named callbacks probe calls resolve to.
    fn register_callbacks(&mut self, callbacks: EngineCallbacks);

    /// Run the transform over `input`, blocking until completion.
    fn run(&mut self, input: &Path) -> Result<String, EngineError>;
}

/// Produces fresh engine instances, one per execution run.
pub trait EngineFactory: Send + Sync {
    fn dialect(&self) -> Dialect;
    fn create(&self) -> Box<dyn TransformEngine>;
}

/// Registry of engine factories keyed by the launch-time selector.
#[derive(Default)]
pub struct EngineRegistry {
    factories: HashMap<String, Arc<dyn EngineFactory>>,
}

impl EngineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, selector: impl Into<String>, factory: Arc<dyn EngineFactory>) {
        self.factories.insert(selector.into(), factory);
    }

    #[must_use]
    pub fn get(&self, selector: &str) -> Option<Arc<dyn EngineFactory>> {
        self.factories.get(selector).cloned()
    }

    #[must_use]
    pub fn selectors(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("selectors", &self.selectors())
            .finish()
    }
}
