//! Evaluate request handling.
//! - handle_evaluate: path expression against the last stop's context

use serde_json::Value;

use crate::protocol::{EvaluateArguments, EvaluateResponseBody, Request};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_evaluate(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<EvaluateArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid evaluate args")],
                ..DispatchOutcome::default()
            };
        };

        // Evaluation failures are diagnostic-path failures: the watch shows
        // an error, the run is untouched.
        match self.session.evaluate(&args.expression) {
            Some(result) => DispatchOutcome {
                responses: vec![self.ok_response(
                    &request,
                    Some(EvaluateResponseBody {
                        result,
                        variables_reference: 0,
                    }),
                )],
                ..DispatchOutcome::default()
            },
            None => DispatchOutcome {
                responses: vec![self.error_response(
                    &request,
                    &format!("cannot evaluate '{}' in the current context", args.expression),
                )],
                ..DispatchOutcome::default()
            },
        }
    }
}
