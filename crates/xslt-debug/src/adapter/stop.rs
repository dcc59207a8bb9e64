//! Stop and termination event forwarding.
//!
//! Run notifications arrive on channels from the worker side; dedicated
//! forwarder threads turn them into DAP events so the protocol loop never
//! blocks on a paused run.

use std::io::BufWriter;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use xslt_runtime::debug::{RunStop, StopReason};

use crate::protocol::{
    Event, ExitedEventBody, MessageType, OutputEventBody, StoppedEventBody, TerminatedEventBody,
};

use super::protocol_io::{write_message_locked, write_protocol_log};

pub(super) struct StopCoordinator {
    pub writer: Arc<Mutex<BufWriter<std::io::Stdout>>>,
    pub logger: Option<Arc<Mutex<BufWriter<std::fs::File>>>>,
    pub seq: Arc<AtomicU32>,
}

impl StopCoordinator {
    pub fn spawn(self, stop_rx: Receiver<RunStop>) -> JoinHandle<()> {
        thread::spawn(move || {
            while let Ok(stop) = stop_rx.recv() {
                if !self.emit_stop(&stop) {
                    break;
                }
            }
        })
    }

    fn emit_stop(&self, stop: &RunStop) -> bool {
        let reason = match stop.reason {
            StopReason::Breakpoint => "breakpoint",
            StopReason::Step => "step",
            StopReason::EntryPause => "entry",
        };
        let output = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            message_type: MessageType::Event,
            event: "output".to_string(),
            body: Some(OutputEventBody {
                output: format!(
                    "[xslt-dap] stopped: reason={reason} line={} depth={}\n",
                    stop.line, stop.depth
                ),
                category: Some("console".to_string()),
                source: None,
                line: Some(stop.line),
            }),
        };
        let stopped = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            message_type: MessageType::Event,
            event: "stopped".to_string(),
            body: Some(StoppedEventBody {
                reason: reason.to_string(),
                thread_id: Some(1),
                all_threads_stopped: Some(true),
                description: stop
                    .node
                    .as_ref()
                    .and_then(|node| node.name.as_ref())
                    .map(|name| format!("at <{name}>")),
            }),
        };
        self.write_event(&output) && self.write_event(&stopped)
    }

    pub(super) fn write_event<T: serde::Serialize>(&self, event: &Event<T>) -> bool {
        let serialized = match serde_json::to_string(event) {
            Ok(serialized) => serialized,
            Err(_) => return true,
        };
        if let Some(logger) = &self.logger {
            let _ = write_protocol_log(logger, "->", &serialized);
        }
        write_message_locked(&self.writer, &serialized).is_ok()
    }
}

/// Forward exactly one `exited(code)` + `terminated` pair per run exit.
pub(super) fn spawn_termination_forwarder(
    coordinator: StopCoordinator,
    term_rx: Receiver<i32>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(exit_code) = term_rx.recv() {
            let exited = Event {
                seq: coordinator.seq.fetch_add(1, Ordering::Relaxed),
                message_type: MessageType::Event,
                event: "exited".to_string(),
                body: Some(ExitedEventBody { exit_code }),
            };
            let terminated = Event {
                seq: coordinator.seq.fetch_add(1, Ordering::Relaxed),
                message_type: MessageType::Event,
                event: "terminated".to_string(),
                body: Some(TerminatedEventBody { restart: None }),
            };
            if !(coordinator.write_event(&exited) && coordinator.write_event(&terminated)) {
                break;
            }
        }
    })
}
