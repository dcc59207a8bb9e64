//! Adapter unit tests.
//! - stdio framing roundtrips
//! - request dispatch against a fake session

use std::io::BufReader;

use indexmap::IndexMap;
use serde_json::{json, Value};
use smol_str::SmolStr;

use xslt_runtime::debug::{RunSinks, RunStop, StopReason};
use xslt_runtime::NodeHandle;

use crate::protocol::{
    LaunchArguments, MessageType, Request, Response, ScopesResponseBody, SetBreakpointsArguments,
    SetBreakpointsResponseBody, StackTraceResponseBody, VariablesResponseBody,
};
use crate::runtime::DebugRuntime;

use super::protocol_io::{read_message, write_message};
use super::DebugAdapter;

#[derive(Default)]
struct FakeRuntime {
    last_stop: Option<RunStop>,
    variables: IndexMap<SmolStr, String>,
    active: bool,
}

impl DebugRuntime for FakeRuntime {
    fn set_sinks(&mut self, _sinks: RunSinks) {}

    fn launch(&mut self, _args: &LaunchArguments) -> Result<String, String> {
        self.active = true;
        Ok("fake run started".to_string())
    }

    fn set_breakpoints(&mut self, args: &SetBreakpointsArguments) -> SetBreakpointsResponseBody {
        let lines: Vec<u32> = args
            .breakpoints
            .as_ref()
            .map(|breakpoints| breakpoints.iter().map(|bp| bp.line).collect())
            .or_else(|| args.lines.clone())
            .unwrap_or_default();
        SetBreakpointsResponseBody {
            breakpoints: lines
                .into_iter()
                .map(|line| crate::protocol::Breakpoint::verified(line, None))
                .collect(),
        }
    }

    fn continue_run(&mut self) -> bool {
        self.active
    }

    fn step_over(&mut self) -> bool {
        self.active
    }

    fn step_in(&mut self) -> bool {
        self.active
    }

    fn step_out(&mut self) -> bool {
        self.active
    }

    fn detach(&mut self) {
        self.active = false;
    }

    fn has_active_run(&self) -> bool {
        self.active
    }

    fn last_stop(&self) -> Option<RunStop> {
        self.last_stop.clone()
    }

    fn variables(&self) -> IndexMap<SmolStr, String> {
        self.variables.clone()
    }

    fn evaluate(&self, expression: &str) -> Option<String> {
        self.last_stop.as_ref()?.node.as_ref()?.select(expression)
    }
}

fn sample_stop() -> RunStop {
    let child = NodeHandle {
        name: Some(SmolStr::new("item")),
        kind: SmolStr::new("element"),
        value: "first".to_string(),
        path: None,
        attributes: vec![(SmolStr::new("id"), "a".to_string())],
        children: Vec::new(),
    };
    let node = NodeHandle {
        name: Some(SmolStr::new("catalog")),
        kind: SmolStr::new("element"),
        value: "first".to_string(),
        path: Some("/catalog[1]".to_string()),
        attributes: vec![(SmolStr::new("count"), "1".to_string())],
        children: vec![child],
    };
    RunStop {
        file: "/sheets/main.xsl".to_string(),
        line: 7,
        reason: StopReason::Breakpoint,
        node: Some(node),
        depth: 0,
    }
}

fn request(seq: u32, command: &str, arguments: Option<Value>) -> Request<Value> {
    Request {
        seq,
        message_type: MessageType::Request,
        command: command.to_string(),
        arguments,
    }
}

fn response_of<T: serde::de::DeserializeOwned>(outcome: &super::DispatchOutcome) -> Response<T> {
    serde_json::from_value(outcome.responses[0].clone()).expect("decode response")
}

#[test]
fn stdio_roundtrip() {
    let payload = r#"{"seq":1,"type":"request","command":"initialize"}"#;
    let mut buffer = Vec::new();
    write_message(&mut buffer, payload).unwrap();

    let mut reader = BufReader::new(&buffer[..]);
    let read = read_message(&mut reader).unwrap().unwrap();
    assert_eq!(read, payload);
}

#[test]
fn initialize_advertises_capabilities_and_emits_initialized() {
    let mut adapter = DebugAdapter::new(FakeRuntime::default());
    let outcome = adapter.dispatch_request(request(1, "initialize", None));

    let response: Response<Value> = response_of(&outcome);
    assert!(response.success);
    let body = response.body.unwrap();
    assert_eq!(body.get("supportsConfigurationDoneRequest"), Some(&json!(true)));

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].get("event"), Some(&json!("initialized")));
}

#[test]
fn unsupported_commands_fail_naming_the_command() {
    let mut adapter = DebugAdapter::new(FakeRuntime::default());
    let outcome = adapter.dispatch_request(request(1, "restartFrame", None));

    let response: Response<Value> = response_of(&outcome);
    assert!(!response.success);
    assert!(response.message.unwrap().contains("restartFrame"));
}

#[test]
fn launch_defers_until_configuration_done() {
    let mut adapter = DebugAdapter::new(FakeRuntime::default());
    adapter.dispatch_request(request(1, "initialize", None));

    let launch = adapter.dispatch_request(request(2, "launch", Some(json!({
        "stylesheet": "/sheets/main.xsl",
        "input": "/data/in.xml",
    }))));
    assert!(launch.responses.is_empty(), "launch must queue until configured");

    let done = adapter.dispatch_request(request(3, "configurationDone", None));
    assert_eq!(done.responses.len(), 2);
    let launch_response: Response<Value> =
        serde_json::from_value(done.responses[1].clone()).unwrap();
    assert!(launch_response.success);
    assert_eq!(launch_response.command, "launch");
}

#[test]
fn set_breakpoints_dispatch_returns_session_verification() {
    let mut adapter = DebugAdapter::new(FakeRuntime::default());
    let args = json!({
        "source": {"path": "/sheets/main.xsl"},
        "breakpoints": [{"line": 4}, {"line": 9}],
    });
    let outcome = adapter.dispatch_request(request(1, "setBreakpoints", Some(args)));

    let response: Response<SetBreakpointsResponseBody> = response_of(&outcome);
    let body = response.body.unwrap();
    assert_eq!(body.breakpoints.len(), 2);
    assert!(body.breakpoints.iter().all(|bp| bp.verified));
}

#[test]
fn stack_trace_is_one_synthetic_frame_at_the_last_stop() {
    let session = FakeRuntime {
        last_stop: Some(sample_stop()),
        ..FakeRuntime::default()
    };
    let mut adapter = DebugAdapter::new(session);
    let outcome =
        adapter.dispatch_request(request(1, "stackTrace", Some(json!({"threadId": 1}))));

    let response: Response<StackTraceResponseBody> = response_of(&outcome);
    let body = response.body.unwrap();
    assert_eq!(body.stack_frames.len(), 1);
    assert_eq!(body.stack_frames[0].line, 7);
    assert_eq!(body.stack_frames[0].name, "<catalog>");
}

#[test]
fn scopes_then_variables_expand_the_context_lazily() {
    let mut variables = IndexMap::new();
    variables.insert(SmolStr::new("position"), "2".to_string());
    let session = FakeRuntime {
        last_stop: Some(sample_stop()),
        variables,
        ..FakeRuntime::default()
    };
    let mut adapter = DebugAdapter::new(session);

    let outcome = adapter.dispatch_request(request(1, "scopes", Some(json!({"frameId": 0}))));
    let response: Response<ScopesResponseBody> = response_of(&outcome);
    let scopes = response.body.unwrap().scopes;
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0].name, "Context");
    assert_eq!(scopes[1].name, "Variables");

    let outcome = adapter.dispatch_request(request(
        2,
        "variables",
        Some(json!({"variablesReference": scopes[0].variables_reference})),
    ));
    let response: Response<VariablesResponseBody> = response_of(&outcome);
    let rows = response.body.unwrap().variables;
    let names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
    assert!(names.contains(&"name"));
    assert!(names.contains(&"attributes"));
    assert!(names.contains(&"children"));

    let children_ref = rows
        .iter()
        .find(|row| row.name == "children")
        .unwrap()
        .variables_reference;
    let outcome = adapter.dispatch_request(request(
        3,
        "variables",
        Some(json!({"variablesReference": children_ref})),
    ));
    let response: Response<VariablesResponseBody> = response_of(&outcome);
    let rows = response.body.unwrap().variables;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "item");
    assert!(rows[0].variables_reference > 0, "item has an attribute to expand");

    let outcome = adapter.dispatch_request(request(
        4,
        "variables",
        Some(json!({"variablesReference": scopes[1].variables_reference})),
    ));
    let response: Response<VariablesResponseBody> = response_of(&outcome);
    let rows = response.body.unwrap().variables;
    assert_eq!(rows[0].name, "position");
    assert_eq!(rows[0].value, "2");
}

#[test]
fn scopes_discard_handles_from_the_previous_stop() {
    let session = FakeRuntime {
        last_stop: Some(sample_stop()),
        ..FakeRuntime::default()
    };
    let mut adapter = DebugAdapter::new(session);

    let outcome = adapter.dispatch_request(request(1, "scopes", Some(json!({"frameId": 0}))));
    let response: Response<ScopesResponseBody> = response_of(&outcome);
    let old_ref = response.body.unwrap().scopes[0].variables_reference;

    // A new scopes request rebuilds the registry; the tree is not persistent.
    adapter.dispatch_request(request(2, "scopes", Some(json!({"frameId": 0}))));
    let outcome = adapter.dispatch_request(request(
        3,
        "variables",
        Some(json!({"variablesReference": old_ref + 100})),
    ));
    let response: Response<VariablesResponseBody> = response_of(&outcome);
    assert!(response.body.unwrap().variables.is_empty());
}

#[test]
fn evaluate_resolves_paths_against_the_stop_context() {
    let session = FakeRuntime {
        last_stop: Some(sample_stop()),
        ..FakeRuntime::default()
    };
    let mut adapter = DebugAdapter::new(session);

    let outcome = adapter.dispatch_request(request(
        1,
        "evaluate",
        Some(json!({"expression": "item/@id"})),
    ));
    let response: Response<Value> = response_of(&outcome);
    assert!(response.success);
    assert_eq!(response.body.unwrap().get("result"), Some(&json!("a")));

    let outcome = adapter.dispatch_request(request(
        2,
        "evaluate",
        Some(json!({"expression": "missing/steps"})),
    ));
    let response: Response<Value> = response_of(&outcome);
    assert!(!response.success);
}

#[test]
fn run_control_without_an_active_run_fails() {
    let mut adapter = DebugAdapter::new(FakeRuntime::default());
    let outcome = adapter.dispatch_request(request(1, "continue", Some(json!({"threadId": 1}))));
    let response: Response<Value> = response_of(&outcome);
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("no active transform run"));
}

#[test]
fn disconnect_detaches_and_exits() {
    let session = FakeRuntime {
        active: true,
        ..FakeRuntime::default()
    };
    let mut adapter = DebugAdapter::new(session);
    let outcome = adapter.dispatch_request(request(1, "disconnect", None));
    assert!(outcome.should_exit);
    assert!(!adapter.session().has_active_run());
    assert!(outcome
        .events
        .iter()
        .any(|event| event.get("event") == Some(&json!("terminated"))));
}
