//! Adapter core loop + request dispatch.
//! - DebugAdapter::new/session accessors
//! - run_stdio: blocking protocol loop with forwarder threads
//! - dispatch_request: route DAP requests
//! - response/event helpers

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, BufReader, BufWriter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use serde::Serialize;
use serde_json::Value;

use xslt_runtime::debug::{LogCategory, RunLog, RunSinks, RunStop};

use crate::protocol::{Event, MessageType, OutputEventBody, Request, Response};
use crate::runtime::DebugRuntime;

use super::protocol_io::{read_message, write_message_locked, write_protocol_log};
use super::stop::{spawn_termination_forwarder, StopCoordinator};
use super::{DebugAdapter, DispatchOutcome, LaunchState};

impl DebugAdapter {
    #[must_use]
    pub fn new(session: impl DebugRuntime + 'static) -> Self {
        Self {
            session: Box::new(session),
            next_seq: Arc::new(AtomicU32::new(1)),
            variable_handles: HashMap::new(),
            next_variable_ref: 1,
            launch_state: LaunchState::default(),
        }
    }

    pub fn session(&self) -> &dyn DebugRuntime {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> &mut dyn DebugRuntime {
        self.session.as_mut()
    }

    /// Run a blocking stdio loop that processes DAP requests. Stop, output,
    /// and termination notifications are forwarded by dedicated threads so
    /// the loop keeps serving requests while the transform is paused.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin.lock());
        let writer = Arc::new(Mutex::new(BufWriter::new(io::stdout())));

        let dap_log = std::env::var("XSLT_DEBUG_DAP_LOG")
            .ok()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok())
            .map(BufWriter::new)
            .map(|logger| Arc::new(Mutex::new(logger)));

        let (log_tx, log_rx) = mpsc::channel::<RunLog>();
        let (stop_tx, stop_rx) = mpsc::channel::<RunStop>();
        let (term_tx, term_rx) = mpsc::channel::<i32>();
        self.session.set_sinks(RunSinks {
            log_tx,
            stop_tx,
            term_tx,
        });

        let _log_thread = spawn_log_forwarder(
            Arc::clone(&writer),
            dap_log.clone(),
            Arc::clone(&self.next_seq),
            log_rx,
        );
        let _stop_thread = StopCoordinator {
            writer: Arc::clone(&writer),
            logger: dap_log.clone(),
            seq: Arc::clone(&self.next_seq),
        }
        .spawn(stop_rx);
        let _term_thread = spawn_termination_forwarder(
            StopCoordinator {
                writer: Arc::clone(&writer),
                logger: dap_log.clone(),
                seq: Arc::clone(&self.next_seq),
            },
            term_rx,
        );

        loop {
            let Some(payload) = read_message(&mut reader)? else {
                tracing::info!("client closed the request stream");
                break;
            };
            if let Some(logger) = &dap_log {
                let _ = write_protocol_log(logger, "<-", &payload);
            }

            let request: Request<Value> = match serde_json::from_str(&payload) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(%err, "dropping unparseable request");
                    continue;
                }
            };

            let outcome = self.dispatch_request(request);
            for message in outcome.responses.iter().chain(outcome.events.iter()) {
                let serialized = serde_json::to_string(message)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                if let Some(logger) = &dap_log {
                    let _ = write_protocol_log(logger, "->", &serialized);
                }
                write_message_locked(&writer, &serialized)?;
            }
            if outcome.should_exit {
                break;
            }
        }

        // The session stops reporting; a run without cooperative
        // cancellation keeps draining in the background.
        self.session.detach();
        Ok(())
    }

    pub(super) fn dispatch_request(&mut self, request: Request<Value>) -> DispatchOutcome {
        if request.message_type != MessageType::Request {
            return DispatchOutcome::default();
        }

        match request.command.as_str() {
            "initialize" => self.handle_initialize(request),
            "launch" => self.handle_launch(request),
            "configurationDone" => self.handle_configuration_done(request),
            "setBreakpoints" => self.handle_set_breakpoints(request),
            "threads" => self.handle_threads(request),
            "stackTrace" => self.handle_stack_trace(request),
            "scopes" => self.handle_scopes(request),
            "variables" => self.handle_variables(request),
            "evaluate" => self.handle_evaluate(request),
            "continue" => self.handle_continue(request),
            "next" => self.handle_next(request),
            "stepIn" => self.handle_step_in(request),
            "stepOut" => self.handle_step_out(request),
            "disconnect" => self.handle_disconnect(request),
            "terminate" => self.handle_terminate(request),
            _ => {
                let message = format!("unsupported command '{}'", request.command);
                DispatchOutcome {
                    responses: vec![self.error_response(&request, &message)],
                    ..DispatchOutcome::default()
                }
            }
        }
    }

    fn next_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn ok_response<T>(&self, request: &Request<Value>, body: Option<T>) -> Value
    where
        T: Serialize,
    {
        let body = body
            .map(|payload| serde_json::to_value(payload))
            .transpose()
            .unwrap_or(None);
        let response = Response {
            seq: self.next_seq(),
            message_type: MessageType::Response,
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        };
        serde_json::to_value(response).unwrap_or(Value::Null)
    }

    pub(super) fn error_response(&self, request: &Request<Value>, message: &str) -> Value {
        let response: Response<Value> = Response {
            seq: self.next_seq(),
            message_type: MessageType::Response,
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(message.to_string()),
            body: None,
        };
        serde_json::to_value(response).unwrap_or(Value::Null)
    }

    pub(super) fn event<T>(&self, name: &str, body: Option<T>) -> Value
    where
        T: Serialize,
    {
        let body = body
            .map(|payload| serde_json::to_value(payload))
            .transpose()
            .unwrap_or(None);
        let event = Event {
            seq: self.next_seq(),
            message_type: MessageType::Event,
            event: name.to_string(),
            body,
        };
        serde_json::to_value(event).unwrap_or(Value::Null)
    }

    pub(super) fn console_message(&self, message: impl Into<String>) -> Value {
        let body = OutputEventBody {
            output: format!("{}\n", message.into()),
            category: Some("console".to_string()),
            source: None,
            line: None,
        };
        self.event("output", Some(body))
    }
}

fn spawn_log_forwarder(
    writer: Arc<Mutex<BufWriter<io::Stdout>>>,
    logger: Option<Arc<Mutex<BufWriter<std::fs::File>>>>,
    seq: Arc<AtomicU32>,
    log_rx: mpsc::Receiver<RunLog>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(log) = log_rx.recv() {
            let output = if log.message.ends_with('\n') {
                log.message
            } else {
                format!("{}\n", log.message)
            };
            let category = match log.category {
                LogCategory::Output => "stdout",
                _ => "console",
            };
            let event = Event {
                seq: seq.fetch_add(1, Ordering::Relaxed),
                message_type: MessageType::Event,
                event: "output".to_string(),
                body: Some(OutputEventBody {
                    output,
                    category: Some(category.to_string()),
                    source: None,
                    line: None,
                }),
            };
            let serialized = match serde_json::to_string(&event) {
                Ok(serialized) => serialized,
                Err(_) => continue,
            };
            if let Some(logger) = &logger {
                let _ = write_protocol_log(logger, "->", &serialized);
            }
            if write_message_locked(&writer, &serialized).is_err() {
                break;
            }
        }
    })
}
