//! Scope enumeration handler.
//! - handle_scopes: rebuild the lazy variable tree for the current stop

use serde_json::Value;

use crate::protocol::{Request, Scope, ScopesArguments, ScopesResponseBody};

use super::super::{DebugAdapter, DispatchOutcome, VariableHandle};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_scopes(&mut self, request: Request<Value>) -> DispatchOutcome {
        let Some(_args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<ScopesArguments>(value).ok())
        else {
            return DispatchOutcome {
                responses: vec![self.error_response(&request, "invalid scopes args")],
                ..DispatchOutcome::default()
            };
        };

        // Handles from the previous stop are stale; the tree is rebuilt
        // from the current stop and discarded on the next one.
        self.variable_handles.clear();
        self.next_variable_ref = 1;

        let stop = self.session.last_stop();
        let mut scopes = Vec::new();

        if let Some(node) = stop.as_ref().and_then(|stop| stop.node.clone()) {
            let context_ref = self.alloc_variable_handle(VariableHandle::Context(node));
            scopes.push(Scope {
                name: "Context".to_string(),
                variables_reference: context_ref,
                expensive: false,
                line: stop.as_ref().map(|stop| stop.line),
            });
        }

        if !self.session.variables().is_empty() {
            let variables_ref = self.alloc_variable_handle(VariableHandle::Variables);
            scopes.push(Scope {
                name: "Variables".to_string(),
                variables_reference: variables_ref,
                expensive: false,
                line: None,
            });
        }

        let body = ScopesResponseBody { scopes };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
