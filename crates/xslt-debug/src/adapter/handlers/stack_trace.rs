//! Stack trace request handling.
//! - handle_stack_trace: one synthetic frame at the last stop

use serde_json::Value;

use crate::protocol::{
    Request, Source, StackFrame, StackTraceArguments, StackTraceResponseBody,
};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_stack_trace(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<StackTraceArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid stackTrace args")],
                ..DispatchOutcome::default()
            };
        };

        let stack_frames = match self.session.last_stop() {
            Some(stop) => {
                let name = stop
                    .node
                    .as_ref()
                    .and_then(|node| node.name.as_ref())
                    .map(|name| format!("<{name}>"))
                    .unwrap_or_else(|| "Transform".to_string());
                vec![StackFrame {
                    id: 0,
                    name,
                    source: Some(Source::from_path(stop.file.clone())),
                    line: stop.line,
                    column: 1,
                }]
            }
            None => Vec::new(),
        };

        let total_frames = stack_frames.len() as u32;
        let body = StackTraceResponseBody {
            stack_frames,
            total_frames: Some(total_frames),
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
