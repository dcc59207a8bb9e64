//! Execution adapters.
//!
//! An adapter owns one engine instance for one run: it instruments the
//! stylesheet, wires probe callbacks into the run's [`DebugControl`], and
//! drives the blocking transform on a dedicated worker thread. Two variants
//! share this core and differ only in grammar rules and compatibility
//! policy.

mod classic;
mod modern;

pub use classic::ClassicAdapter;
pub use modern::ModernAdapter;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use xslt_sheet::{
    find_embedded_script, is_stylesheet_root, parse_document, plan, stylesheet_version,
    write_document, Dialect, DialectRules,
};

use crate::debug::{DebugControl, LogCategory, RunSinks, Verbosity};
use crate::engine::{EngineCallbacks, TransformEngine};
use crate::error::LaunchError;
use crate::node::NodeHandle;
use crate::trace::parse_trace_message;

/// Everything a `launch` request provides for one run.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub stylesheet: PathBuf,
    pub input: PathBuf,
    pub stop_on_entry: bool,
    /// When false the run executes uninstrumented, like `Verbosity::None`.
    pub debug: bool,
    pub verbosity: Verbosity,
}

/// Uniform contract over the two engine variants.
pub trait ExecutionAdapter: Send {
    /// Begin the run. Returns immediately; progress, stops, and the single
    /// terminal exit code arrive through the run sinks.
    fn start(&mut self, spec: &LaunchSpec) -> Result<(), LaunchError>;

    /// Replace this run's breakpoint snapshot for one file.
    fn set_breakpoints(&mut self, file: &str, lines: &BTreeSet<u32>);

    fn continue_run(&self);
    fn step_over(&self);
    fn step_in(&self);
    fn step_out(&self);

    /// Stop reporting and release any pending pause; the engine drains in
    /// the background if it offers no cooperative cancellation.
    fn detach(&self);

    fn control(&self) -> DebugControl;
    fn dialect(&self) -> Dialect;
}

/// Variant-specific launch policy.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VariantPolicy {
    pub name: &'static str,
    pub dialect: Dialect,
    /// Whether embedded script blocks abort the launch outright.
    pub refuse_embedded_script: bool,
    /// Grammar major version this variant is built for.
    pub expected_major: u32,
}

/// Shared adapter core: run state, instrumentation, worker management.
pub(crate) struct RunCore {
    control: DebugControl,
    sinks: RunSinks,
    worker: Option<JoinHandle<()>>,
}

impl RunCore {
    pub(crate) fn new(sinks: RunSinks) -> Self {
        Self {
            control: DebugControl::new(),
            sinks,
            worker: None,
        }
    }

    pub(crate) fn control(&self) -> DebugControl {
        self.control.clone()
    }

    pub(crate) fn set_breakpoints(&self, file: &str, lines: &BTreeSet<u32>) {
        self.control.set_breakpoints(file, lines.clone());
    }

    /// Report a fatal pre-worker failure: one output line, one
    /// `terminated(1)`.
    fn fail(&self, verbosity: Verbosity, message: impl Into<String>) {
        self.sinks.log(verbosity, LogCategory::Output, message);
        let _ = self.sinks.term_tx.send(1);
    }

    pub(crate) fn launch(
        &mut self,
        mut engine: Box<dyn TransformEngine>,
        policy: VariantPolicy,
        spec: &LaunchSpec,
    ) -> Result<(), LaunchError> {
        if self.worker.is_some() {
            return Err(LaunchError::AlreadyRunning);
        }
        let verbosity = spec.verbosity;

        let stylesheet_text = match std::fs::read_to_string(&spec.stylesheet) {
            Ok(text) => text,
            Err(err) => {
                self.fail(
                    verbosity,
                    format!("cannot read stylesheet {}: {err}", spec.stylesheet.display()),
                );
                return Ok(());
            }
        };
        let input_text = match std::fs::read_to_string(&spec.input) {
            Ok(text) => text,
            Err(err) => {
                self.fail(
                    verbosity,
                    format!("cannot read input {}: {err}", spec.input.display()),
                );
                return Ok(());
            }
        };

        let mut doc = match parse_document(&stylesheet_text) {
            Ok(doc) => doc,
            Err(err) => {
                self.fail(verbosity, format!("stylesheet does not parse: {err}"));
                return Ok(());
            }
        };
        if !is_stylesheet_root(&doc) {
            self.fail(
                verbosity,
                "document root is not a stylesheet or transform element",
            );
            return Ok(());
        }

        if let Some(version) = stylesheet_version(&doc) {
            let major = version
                .split('.')
                .next()
                .and_then(|major| major.parse::<u32>().ok());
            let compatible = match policy.expected_major {
                1 => major == Some(1),
                _ => major.is_some_and(|major| major >= 2),
            };
            if !compatible {
                self.sinks.log(
                    verbosity,
                    LogCategory::Log,
                    format!(
                        "stylesheet declares version {version}; the {} engine targets {}.x",
                        policy.name, policy.expected_major
                    ),
                );
            }
        }

        if let Some((_, line)) = find_embedded_script(&doc) {
            if policy.refuse_embedded_script {
                self.fail(
                    verbosity,
                    format!(
                        "embedded script block at line {line} is not supported by the {} engine; \
                         run it with the 1.0 engine instead",
                        policy.name
                    ),
                );
                return Ok(());
            }
        }

        let instrument = spec.debug && verbosity != Verbosity::None;
        let compiled_text = if instrument {
            let rules = DialectRules::for_dialect(policy.dialect);
            match plan(&mut doc, &rules) {
                Ok(report) => {
                    self.sinks.log(
                        verbosity,
                        LogCategory::Log,
                        format!(
                            "instrumented {} probe(s) across {} line(s)",
                            report.inserted,
                            report.instrumented_lines.len()
                        ),
                    );
                    write_document(&doc)
                }
                Err(err) => {
                    self.fail(verbosity, format!("instrumentation failed: {err}"));
                    return Ok(());
                }
            }
        } else {
            stylesheet_text
        };

        let stylesheet_path = spec.stylesheet.to_string_lossy().into_owned();
        self.control.reset_for_run(&stylesheet_path);
        self.control.set_stop_sender(self.sinks.stop_tx.clone());
        if spec.stop_on_entry && instrument {
            self.control.request_entry_pause();
        }

        let base_dir = spec
            .stylesheet
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if let Err(diagnostics) = engine.compile(&compiled_text, &base_dir) {
            for diagnostic in &diagnostics {
                self.sinks
                    .log(verbosity, LogCategory::Output, diagnostic.to_string());
            }
            self.fail(
                verbosity,
                format!("stylesheet failed to compile ({} error(s))", diagnostics.len()),
            );
            return Ok(());
        }

        engine.register_callbacks(build_callbacks(
            self.control.clone(),
            self.sinks.clone(),
            verbosity,
            Arc::from(input_text),
        ));

        let sinks = self.sinks.clone();
        let input = spec.input.clone();
        self.worker = Some(thread::spawn(move || {
            let guard = TerminationGuard::new(sinks.term_tx.clone());
            match engine.run(&input) {
                Ok(output) => {
                    sinks.log(verbosity, LogCategory::Output, output);
                    guard.finish(0);
                }
                Err(err) => {
                    sinks.log(verbosity, LogCategory::Output, err.to_string());
                    guard.finish(1);
                }
            }
        }));
        Ok(())
    }
}

fn build_callbacks(
    control: DebugControl,
    sinks: RunSinks,
    verbosity: Verbosity,
    input_text: Arc<str>,
) -> EngineCallbacks {
    let probe_control = control.clone();
    let probe_sinks = sinks.clone();
    let trace_control = control.clone();
    let trace_sinks = sinks.clone();
    let position_control = control.clone();
    let position_sinks = sinks.clone();

    EngineCallbacks {
        on_probe: Arc::new(move |line, node, marker| {
            probe_sinks.log(
                verbosity,
                LogCategory::TraceAll,
                format!("probe at line {line}"),
            );
            let handle = node
                .as_deref()
                .map(|node| NodeHandle::rehome(node, &input_text));
            probe_control.on_probe(line, marker, handle);
        }),
        on_position: Arc::new(move |line, position| {
            position_control.record_variable("position", &position.to_string());
            position_sinks.log(
                verbosity,
                LogCategory::Trace,
                format!("[xslt-trace] position={position} (line {line})"),
            );
        }),
        on_trace: Arc::new(move |name, value| {
            trace_control.record_variable(name, value);
            trace_sinks.log(
                verbosity,
                LogCategory::Trace,
                format!("[xslt-trace] {name}={value}"),
            );
        }),
        on_message: Arc::new(move |text| {
            if let Some((name, value)) = parse_trace_message(text) {
                control.record_variable(name, value);
                sinks.log(verbosity, LogCategory::Trace, text);
            } else {
                sinks.log(verbosity, LogCategory::Log, text);
            }
        }),
    }
}

/// Sends the exit code exactly once, even when the worker unwinds.
struct TerminationGuard {
    tx: Sender<i32>,
    sent: bool,
}

impl TerminationGuard {
    fn new(tx: Sender<i32>) -> Self {
        Self { tx, sent: false }
    }

    fn finish(mut self, code: i32) {
        self.sent = true;
        let _ = self.tx.send(code);
    }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(1);
        }
    }
}
