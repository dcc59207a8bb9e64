//! Thread requests.
//! - handle_threads: single transform thread

use serde_json::Value;

use crate::protocol::{Request, Thread, ThreadsResponseBody};

use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_threads(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        // One worker per run; the client always sees a single thread.
        let body = ThreadsResponseBody {
            threads: vec![Thread {
                id: 1,
                name: "Transform".to_string(),
            }],
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
