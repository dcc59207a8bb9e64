//! Initialize/launch/configuration handlers.
//! - handle_initialize: capabilities + initialized event
//! - handle_launch: deferred until configurationDone
//! - handle_configuration_done: apply the queued launch

use serde_json::Value;

use crate::protocol::{
    Capabilities, InitializeResponseBody, LaunchArguments, Request,
};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_initialize(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        self.launch_state = Default::default();

        let capabilities = Capabilities {
            supports_configuration_done_request: Some(true),
            supports_conditional_breakpoints: Some(false),
            supports_evaluate_for_hovers: Some(true),
            supports_terminate_request: Some(true),
            supports_step_back: Some(false),
        };
        let response = self.ok_response(&request, Some(InitializeResponseBody { capabilities }));
        let initialized = self.event("initialized", Option::<Value>::None);

        DispatchOutcome {
            responses: vec![response],
            events: vec![initialized],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_launch(&mut self, request: Request<Value>) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<LaunchArguments>(value).ok())
            .unwrap_or_default();

        if !self.launch_state.is_configured() {
            self.launch_state.set_pending(request, args);
            return DispatchOutcome {
                events: vec![
                    self.console_message("[xslt-dap] launch deferred until configurationDone")
                ],
                ..DispatchOutcome::default()
            };
        }

        self.handle_launch_inner(request, args)
    }

    pub(in crate::adapter) fn handle_launch_inner(
        &mut self,
        request: Request<Value>,
        args: LaunchArguments,
    ) -> DispatchOutcome {
        match self.session.launch(&args) {
            Ok(summary) => DispatchOutcome {
                responses: vec![self.ok_response::<Value>(&request, None)],
                events: vec![self.console_message(format!("[xslt-dap] {summary}"))],
                ..DispatchOutcome::default()
            },
            Err(message) => DispatchOutcome {
                responses: vec![self.error_response(&request, &message)],
                events: vec![self.console_message(format!("[xslt-dap] launch failed: {message}"))],
                ..DispatchOutcome::default()
            },
        }
    }

    pub(in crate::adapter) fn handle_configuration_done(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let pending = self.launch_state.take_pending();
        self.launch_state.set_configured();

        let mut outcome = DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            ..DispatchOutcome::default()
        };
        if let Some((launch_request, args)) = pending {
            let mut launch_outcome = self.handle_launch_inner(launch_request, args);
            outcome.responses.append(&mut launch_outcome.responses);
            outcome.events.append(&mut launch_outcome.events);
        }
        outcome
    }
}
