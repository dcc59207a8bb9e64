//! Continue/step handlers.
//! - handle_continue: resume execution
//! - handle_next/step_in/step_out: stepping commands
//!
//! All four are non-blocking: they set or clear the run's step request,
//! release a pending pause, and return immediately.

use serde_json::Value;

use crate::protocol::{
    ContinueArguments, ContinueResponseBody, NextArguments, Request, StepInArguments,
    StepOutArguments,
};

use super::super::{DebugAdapter, DispatchOutcome};

const MSG_NO_RUN: &str = "no active transform run";

impl DebugAdapter {
    pub(in crate::adapter) fn handle_continue(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<ContinueArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid continue args")],
                ..DispatchOutcome::default()
            };
        };

        if !self.session.continue_run() {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, MSG_NO_RUN)],
                ..DispatchOutcome::default()
            };
        }

        DispatchOutcome {
            responses: vec![self.ok_response(
                &request,
                Some(ContinueResponseBody {
                    all_threads_continued: Some(true),
                }),
            )],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_next(&mut self, request: Request<Value>) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<NextArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid next args")],
                ..DispatchOutcome::default()
            };
        };

        if !self.session.step_over() {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, MSG_NO_RUN)],
                ..DispatchOutcome::default()
            };
        }

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_step_in(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<StepInArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid stepIn args")],
                ..DispatchOutcome::default()
            };
        };

        if !self.session.step_in() {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, MSG_NO_RUN)],
                ..DispatchOutcome::default()
            };
        }

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_step_out(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<StepOutArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid stepOut args")],
                ..DispatchOutcome::default()
            };
        };

        if !self.session.step_out() {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, MSG_NO_RUN)],
                ..DispatchOutcome::default()
            };
        }

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            ..DispatchOutcome::default()
        }
    }
}
