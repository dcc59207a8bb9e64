//! Breakpoint requests.
//! - handle_set_breakpoints: store, verify, and apply per-file sets

use serde_json::Value;

use crate::protocol::{Request, SetBreakpointsArguments};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_set_breakpoints(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<SetBreakpointsArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid setBreakpoints args")],
                ..DispatchOutcome::default()
            };
        };

        let requested = args
            .breakpoints
            .as_ref()
            .map(|items| items.len())
            .or_else(|| args.lines.as_ref().map(|items| items.len()))
            .unwrap_or(0);
        let events = vec![self.console_message(format!(
            "[xslt-dap] setBreakpoints: path={} requested={}",
            args.source.path.as_deref().unwrap_or("<none>"),
            requested
        ))];

        let body = self.session.set_breakpoints(&args);
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            events,
            ..DispatchOutcome::default()
        }
    }
}
