//! End-to-end run scenarios against a scripted engine.
//!
//! The engine contract is exercised with a fake that replays a fixed probe
//! visitation schedule on the worker thread, which is exactly what a real
//! engine does with an instrumented stylesheet.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use xslt_runtime::debug::{RunLog, RunSinks, RunStop, StopReason, Verbosity};
use xslt_runtime::{
    ClassicAdapter, CompileDiagnostic, Dialect, EngineCallbacks, EngineError, EngineFactory,
    EngineNode, ExecutionAdapter, LaunchSpec, ModernAdapter, TransformEngine,
};

const RECV: Duration = Duration::from_millis(500);

const SHEET: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="1.0">
<xsl:template name="main">
<xsl:for-each select="item">
<xsl:value-of select="."/>
</xsl:for-each>
</xsl:template>
</xsl:stylesheet>"#;


const INPUT: &str = r#"<catalog><item id="a">first</item><item id="b">second</item></catalog>"#;

#[derive(Clone)]
enum Ev {
    Probe(u32),
    ProbeAt(u32, &'static str),
    Enter(u32),
    Exit(u32),
    Pos(u32, u32),
    Message(&'static str),
}

struct PathNode {
    path: String,
}

impl EngineNode for PathNode {
    fn absolute_path(&self) -> Option<String> {
        Some(self.path.clone())
    }
    fn name(&self) -> Option<String> {
        None
    }
    fn string_value(&self) -> String {
        String::new()
    }
    fn node_kind(&self) -> &str {
        "element"
    }
}

struct ScriptedEngine {
    script: Vec<Ev>,
    callbacks: Option<EngineCallbacks>,
    compiled: Arc<Mutex<Option<String>>>,
    compile_errors: Vec<CompileDiagnostic>,
    run_error: Option<String>,
}

impl TransformEngine for ScriptedEngine {
    fn dialect(&self) -> Dialect {
        Dialect::V1
    }

    fn compile(
        &mut self,
        stylesheet: &str,
        _base_dir: &Path,
    ) -> Result<(), Vec<CompileDiagnostic>> {
        *self.compiled.lock().unwrap() = Some(stylesheet.to_string());
        if self.compile_errors.is_empty() {
            Ok(())
        } else {
            Err(self.compile_errors.clone())
        }
    }

    fn register_callbacks(&mut self, callbacks: EngineCallbacks) {
        self.callbacks = Some(callbacks);
    }

    fn run(&mut self, _input: &Path) -> Result<String, EngineError> {
        let callbacks = self.callbacks.as_ref().expect("callbacks registered");
        for event in &self.script {
            match event {
                Ev::Probe(line) => (callbacks.on_probe)(*line, None, None),
                Ev::ProbeAt(line, path) => (callbacks.on_probe)(
                    *line,
                    Some(Box::new(PathNode {
                        path: (*path).to_string(),
                    })),
                    None,
                ),
                Ev::Enter(line) => (callbacks.on_probe)(
                    *line,
                    None,
                    Some(xslt_runtime::ProbeMarker::ScopeEntry),
                ),
                Ev::Exit(line) => (callbacks.on_probe)(
                    *line,
                    None,
                    Some(xslt_runtime::ProbeMarker::ScopeExit),
                ),
                Ev::Pos(line, position) => (callbacks.on_position)(*line, *position),
                Ev::Message(text) => (callbacks.on_message)(text),
            }
        }
        match &self.run_error {
            Some(error) => Err(EngineError::Transform(error.clone())),
            None => Ok("<out/>".to_string()),
        }
    }
}

struct ScriptedFactory {
    script: Vec<Ev>,
    compiled: Arc<Mutex<Option<String>>>,
    compile_errors: Vec<CompileDiagnostic>,
    run_error: Option<String>,
}

impl ScriptedFactory {
    fn new(script: Vec<Ev>) -> Self {
        Self {
            script,
            compiled: Arc::new(Mutex::new(None)),
            compile_errors: Vec::new(),
            run_error: None,
        }
    }
}

impl EngineFactory for ScriptedFactory {
    fn dialect(&self) -> Dialect {
        Dialect::V1
    }

    fn create(&self) -> Box<dyn TransformEngine> {
        Box::new(ScriptedEngine {
            script: self.script.clone(),
            callbacks: None,
            compiled: Arc::clone(&self.compiled),
            compile_errors: self.compile_errors.clone(),
            run_error: self.run_error.clone(),
        })
    }
}

struct Harness {
    adapter: Box<dyn ExecutionAdapter>,
    log_rx: Receiver<RunLog>,
    stop_rx: Receiver<RunStop>,
    term_rx: Receiver<i32>,
    stylesheet: PathBuf,
}

fn temp_file(test: &str, name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("xslt-runtime-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{test}-{name}"));
    std::fs::write(&path, content).unwrap();
    path
}

fn harness(test: &str, factory: ScriptedFactory, modern: bool, sheet: &str) -> Harness {
    let (log_tx, log_rx) = channel();
    let (stop_tx, stop_rx) = channel();
    let (term_tx, term_rx) = channel();
    let sinks = RunSinks {
        log_tx,
        stop_tx,
        term_tx,
    };
    let factory: Arc<dyn EngineFactory> = Arc::new(factory);
    let adapter: Box<dyn ExecutionAdapter> = if modern {
        Box::new(ModernAdapter::new(factory, sinks))
    } else {
        Box::new(ClassicAdapter::new(factory, sinks))
    };
    let stylesheet = temp_file(test, "sheet.xsl", sheet);
    Harness {
        adapter,
        log_rx,
        stop_rx,
        term_rx,
        stylesheet,
    }
}

fn spec(harness: &Harness, test: &str) -> LaunchSpec {
    LaunchSpec {
        stylesheet: harness.stylesheet.clone(),
        input: temp_file(test, "input.xml", INPUT),
        stop_on_entry: false,
        debug: true,
        verbosity: Verbosity::Trace,
    }
}

fn loop_script() -> Vec<Ev> {
    vec![
        Ev::Enter(2),
        Ev::Probe(3),
        Ev::Pos(3, 1),
        Ev::Probe(4),
        Ev::Probe(3),
        Ev::Pos(3, 2),
        Ev::Probe(4),
        Ev::Probe(3),
        Ev::Pos(3, 3),
        Ev::Probe(4),
        Ev::Exit(2),
    ]
}

fn call_script() -> Vec<Ev> {
    vec![
        Ev::Probe(3),
        Ev::Enter(10),
        Ev::Probe(11),
        Ev::Exit(10),
        Ev::Probe(5),
    ]
}

#[test]
fn loop_breakpoint_stops_each_iteration_then_terminates_cleanly() {
    let mut h = harness("loop", ScriptedFactory::new(loop_script()), false, SHEET);
    let spec = spec(&h, "loop");
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    for _ in 0..3 {
        let stop = h.stop_rx.recv_timeout(RECV).unwrap();
        assert_eq!(stop.reason, StopReason::Breakpoint);
        assert_eq!(stop.line, 3);
        h.adapter.continue_run();
    }
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
    assert!(h.stop_rx.try_recv().is_err());

    let positions: Vec<String> = h
        .log_rx
        .try_iter()
        .filter(|log| log.message.contains("position="))
        .map(|log| log.message)
        .collect();
    assert_eq!(positions.len(), 3);
    for (index, message) in positions.iter().enumerate() {
        assert!(message.contains(&format!("position={}", index + 1)), "{message}");
    }
}

#[test]
fn breakpoint_paths_compare_case_insensitively_and_uri_decoded() {
    let mut h = harness("paths", ScriptedFactory::new(loop_script()), false, SHEET);
    let spec = spec(&h, "paths");
    let client_form = format!(
        "file://{}",
        spec.stylesheet.to_string_lossy().to_uppercase()
    );
    h.adapter.set_breakpoints(&client_form, &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    let stop = h.stop_rx.recv_timeout(RECV).unwrap();
    assert_eq!(stop.reason, StopReason::Breakpoint);
    h.adapter.continue_run();
    for _ in 0..2 {
        h.stop_rx.recv_timeout(RECV).unwrap();
        h.adapter.continue_run();
    }
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn stop_on_entry_pauses_at_first_probe() {
    let mut h = harness("entry", ScriptedFactory::new(loop_script()), false, SHEET);
    let mut spec = spec(&h, "entry");
    spec.stop_on_entry = true;
    h.adapter.start(&spec).unwrap();

    let stop = h.stop_rx.recv_timeout(RECV).unwrap();
    assert_eq!(stop.reason, StopReason::EntryPause);
    assert_eq!(stop.line, 2);
    h.adapter.continue_run();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn step_into_lands_on_scope_entry_probe() {
    let mut h = harness("into", ScriptedFactory::new(call_script()), false, SHEET);
    let spec = spec(&h, "into");
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.stop_rx.recv_timeout(RECV).unwrap().line, 3);
    h.adapter.step_in();
    let stop = h.stop_rx.recv_timeout(RECV).unwrap();
    assert_eq!(stop.reason, StopReason::Step);
    assert_eq!(stop.line, 10);
    assert_eq!(stop.depth, 1);

    h.adapter.continue_run();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn step_over_call_site_returns_at_issuing_depth() {
    let mut h = harness("over", ScriptedFactory::new(call_script()), false, SHEET);
    let spec = spec(&h, "over");
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.stop_rx.recv_timeout(RECV).unwrap().line, 3);
    h.adapter.step_over();
    let stop = h.stop_rx.recv_timeout(RECV).unwrap();
    assert_eq!(stop.reason, StopReason::Step);
    assert_eq!(stop.line, 5);
    assert_eq!(stop.depth, 0);

    h.adapter.continue_run();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn missing_stylesheet_reports_and_terminates_once() {
    let mut h = harness("missing", ScriptedFactory::new(Vec::new()), false, SHEET);
    let mut spec = spec(&h, "missing");
    spec.stylesheet = PathBuf::from("/nonexistent/sheet.xsl");
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 1);
    assert!(h.term_rx.try_recv().is_err());
    assert!(h.stop_rx.try_recv().is_err());
}

#[test]
fn unparseable_stylesheet_yields_no_stops_and_one_failure_exit() {
    let mut h = harness("broken", ScriptedFactory::new(Vec::new()), false, "<xsl:stylesheet");
    let spec = spec(&h, "broken");
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 1);
    assert!(h.term_rx.try_recv().is_err());
    assert!(h.stop_rx.try_recv().is_err());
    let reported = h
        .log_rx
        .try_iter()
        .any(|log| log.message.contains("does not parse"));
    assert!(reported);
}

#[test]
fn failing_transform_terminates_with_one_error_exit() {
    let mut factory = ScriptedFactory::new(Vec::new());
    factory.run_error = Some("input document is not well-formed".to_string());
    let mut h = harness("runfail", factory, false, SHEET);
    let spec = spec(&h, "runfail");
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 1);
    assert!(h.term_rx.try_recv().is_err());
    assert!(h.stop_rx.try_recv().is_err());
}

#[test]
fn compile_diagnostics_are_each_reported() {
    let mut factory = ScriptedFactory::new(Vec::new());
    factory.compile_errors = vec![
        CompileDiagnostic {
            module: Some("sheet.xsl".to_string()),
            line: Some(7),
            column: Some(3),
            message: "unknown instruction".to_string(),
        },
        CompileDiagnostic {
            module: None,
            line: None,
            column: None,
            message: "static error".to_string(),
        },
    ];
    let mut h = harness("compile", factory, false, SHEET);
    let spec = spec(&h, "compile");
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 1);
    let logs: Vec<String> = h.log_rx.try_iter().map(|log| log.message).collect();
    assert!(logs.iter().any(|log| log.contains("line 7, column 3")));
    assert!(logs.iter().any(|log| log.contains("static error")));
}

#[test]
fn modern_variant_refuses_embedded_script_before_compiling() {
    let sheet = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform"
  xmlns:ms="urn:schemas-microsoft-com:xslt" version="3.0">
<ms:script implements-prefix="user">function f() {}</ms:script>
<xsl:template name="main"/>
</xsl:stylesheet>"#;
    let factory = ScriptedFactory::new(Vec::new());
    let compiled = Arc::clone(&factory.compiled);
    let mut h = harness("script-modern", factory, true, sheet);
    let spec = spec(&h, "script-modern");
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 1);
    let logs: Vec<String> = h.log_rx.try_iter().map(|log| log.message).collect();
    assert!(logs.iter().any(|log| log.contains("embedded script")));
    assert!(compiled.lock().unwrap().is_none(), "must abort before compiling");
}

#[test]
fn classic_variant_tolerates_embedded_script() {
    let sheet = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform"
  xmlns:ms="urn:schemas-microsoft-com:xslt" version="1.0">
<ms:script implements-prefix="user">function f() {}</ms:script>
<xsl:template name="main"/>
</xsl:stylesheet>"#;
    let mut h = harness("script-classic", ScriptedFactory::new(Vec::new()), false, sheet);
    let spec = spec(&h, "script-classic");
    h.adapter.start(&spec).unwrap();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn verbosity_none_runs_the_pristine_stylesheet() {
    let factory = ScriptedFactory::new(Vec::new());
    let compiled = Arc::clone(&factory.compiled);
    let mut h = harness("silent", factory, false, SHEET);
    let mut spec = spec(&h, "silent");
    spec.verbosity = Verbosity::None;
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
    assert!(h.stop_rx.try_recv().is_err());
    let compiled = compiled.lock().unwrap();
    let text = compiled.as_deref().unwrap();
    assert!(!text.contains("dbg:"), "instrumentation must be disabled");
}

#[test]
fn trace_messages_are_promoted_into_the_variable_map() {
    let script = vec![
        Ev::Message("[xslt-trace] total=42"),
        Ev::Message("processing item 3"),
    ];
    let mut h = harness("promote", ScriptedFactory::new(script), false, SHEET);
    let spec = spec(&h, "promote");
    h.adapter.start(&spec).unwrap();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);

    let variables = h.adapter.control().variables();
    assert_eq!(variables.get("total").map(String::as_str), Some("42"));
    let logs: Vec<RunLog> = h.log_rx.try_iter().collect();
    assert!(logs.iter().any(|log| log.message == "processing item 3"));
}

#[test]
fn stops_carry_rehomed_node_snapshots() {
    let script = vec![Ev::ProbeAt(3, "/catalog[1]/item[2]")];
    let mut h = harness("node", ScriptedFactory::new(script), false, SHEET);
    let spec = spec(&h, "node");
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    let stop = h.stop_rx.recv_timeout(RECV).unwrap();
    let node = stop.node.expect("node snapshot");
    assert_eq!(node.name.as_deref(), Some("item"));
    assert_eq!(node.value, "second");
    h.adapter.continue_run();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
}

#[test]
fn detach_lets_the_run_drain_in_the_background() {
    let mut h = harness("detach", ScriptedFactory::new(loop_script()), false, SHEET);
    let spec = spec(&h, "detach");
    h.adapter
        .set_breakpoints(&spec.stylesheet.to_string_lossy(), &BTreeSet::from([3]));
    h.adapter.start(&spec).unwrap();

    h.stop_rx.recv_timeout(RECV).unwrap();
    h.adapter.detach();
    assert_eq!(h.term_rx.recv_timeout(RECV).unwrap(), 0);
    assert!(h.stop_rx.try_recv().is_err());
}
