//! Adapter lifecycle handlers.
//! - handle_disconnect / handle_terminate: detach and exit the loop
//!
//! Neither command force-kills the worker thread: the session stops
//! reporting and an engine without cooperative cancellation drains to
//! natural completion in the background.

use serde_json::Value;

use crate::protocol::{
    DisconnectArguments, Request, TerminateArguments, TerminatedEventBody,
};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_disconnect(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<DisconnectArguments>(value).ok());

        self.session.detach();
        let terminated = self.event(
            "terminated",
            Some(TerminatedEventBody {
                restart: args.as_ref().and_then(|args| args.restart),
            }),
        );

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.console_message("[xslt-dap] disconnect"), terminated],
            should_exit: true,
        }
    }

    pub(in crate::adapter) fn handle_terminate(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<TerminateArguments>(value).ok());

        self.session.detach();
        let terminated = self.event(
            "terminated",
            Some(TerminatedEventBody {
                restart: args.as_ref().and_then(|args| args.restart),
            }),
        );

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.console_message("[xslt-dap] terminate"), terminated],
            should_exit: true,
        }
    }
}
