//! Session state: engine registry, breakpoint store, the single active run.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use indexmap::IndexMap;
use smol_str::SmolStr;

use xslt_runtime::debug::{RunSinks, RunStop, Verbosity};
use xslt_runtime::{
    normalize_path, ClassicAdapter, Dialect, EngineRegistry, ExecutionAdapter, LaunchSpec,
    ModernAdapter,
};
use xslt_sheet::{parse_document, plan, stylesheet_version, DialectRules};

use crate::protocol::{
    Breakpoint, LaunchArguments, SetBreakpointsArguments, SetBreakpointsResponseBody, Source,
};
use crate::runtime::DebugRuntime;

const MSG_MISSING_SOURCE: &str = "source path not provided";
const MSG_NO_PROBE_LINE: &str = "no instrumentable instruction on this line";

/// Breakpoints for one file: the client's original path plus the line set.
#[derive(Debug, Clone)]
struct FileBreakpoints {
    client_path: String,
    lines: BTreeSet<u32>,
}

/// Debug session backing the protocol adapter. Holds at most one active
/// execution run; a new launch replaces it and the old run drains silently.
pub struct DebugSession {
    registry: EngineRegistry,
    sinks: Option<RunSinks>,
    adapter: Option<Box<dyn ExecutionAdapter>>,
    breakpoints: HashMap<String, FileBreakpoints>,
}

impl DebugSession {
    #[must_use]
    pub fn new(registry: EngineRegistry) -> Self {
        Self {
            registry,
            sinks: None,
            adapter: None,
            breakpoints: HashMap::new(),
        }
    }

    /// Verify requested lines against a scratch instrumentation pass over
    /// the stylesheet as it exists on disk. Failure to read or parse the
    /// file leaves every breakpoint unverified with an explanation.
    fn verify_lines(&self, path: &str, lines: &BTreeSet<u32>) -> Vec<Breakpoint> {
        let source = Some(Source::from_path(path));
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                return lines
                    .iter()
                    .map(|line| {
                        Breakpoint::unverified(
                            *line,
                            source.clone(),
                            Some(format!("cannot read stylesheet: {err}")),
                        )
                    })
                    .collect();
            }
        };
        let mut doc = match parse_document(&text) {
            Ok(doc) => doc,
            Err(err) => {
                return lines
                    .iter()
                    .map(|line| {
                        Breakpoint::unverified(
                            *line,
                            source.clone(),
                            Some(format!("stylesheet does not parse: {err}")),
                        )
                    })
                    .collect();
            }
        };
        let rules = rules_for_version(stylesheet_version(&doc));
        let report = match plan(&mut doc, &rules) {
            Ok(report) => report,
            Err(err) => {
                return lines
                    .iter()
                    .map(|line| {
                        Breakpoint::unverified(*line, source.clone(), Some(err.to_string()))
                    })
                    .collect();
            }
        };
        lines
            .iter()
            .map(|line| {
                if report.covers_line(*line) {
                    Breakpoint::verified(*line, source.clone())
                } else {
                    Breakpoint::unverified(
                        *line,
                        source.clone(),
                        Some(MSG_NO_PROBE_LINE.to_string()),
                    )
                }
            })
            .collect()
    }
}

impl DebugRuntime for DebugSession {
    fn set_sinks(&mut self, sinks: RunSinks) {
        self.sinks = Some(sinks);
    }

    fn launch(&mut self, args: &LaunchArguments) -> Result<String, String> {
        let sinks = self
            .sinks
            .clone()
            .ok_or_else(|| "session has no notification channels yet".to_string())?;

        let stylesheet = launch_path(args, &["stylesheet", "program"])
            .ok_or_else(|| "launch arguments are missing a stylesheet path".to_string())?;
        let input = launch_path(args, &["input", "data"])
            .ok_or_else(|| "launch arguments are missing an input path".to_string())?;
        let selector = launch_string(args, "engine").unwrap_or_else(|| "classic".to_string());
        let factory = self
            .registry
            .get(&selector)
            .ok_or_else(|| format!("no engine registered for selector '{selector}'"))?;

        let spec = LaunchSpec {
            stylesheet,
            input,
            stop_on_entry: launch_flag(args, "stopOnEntry", false),
            debug: launch_flag(args, "debug", true),
            verbosity: launch_string(args, "verbosity")
                .map(|raw| Verbosity::parse(&raw))
                .unwrap_or_default(),
        };

        // A new launch replaces the session's single run; the old run keeps
        // draining in the background without reporting.
        if let Some(old) = self.adapter.take() {
            old.detach();
        }

        let mut adapter: Box<dyn ExecutionAdapter> = match factory.dialect() {
            Dialect::V1 => Box::new(ClassicAdapter::new(factory, sinks)),
            Dialect::V3 => Box::new(ModernAdapter::new(factory, sinks)),
        };
        for file in self.breakpoints.values() {
            adapter.set_breakpoints(&file.client_path, &file.lines);
        }
        adapter.start(&spec).map_err(|err| err.to_string())?;
        let summary = format!(
            "launched {} engine: {} over {}",
            selector,
            spec.stylesheet.display(),
            spec.input.display()
        );
        self.adapter = Some(adapter);
        Ok(summary)
    }

    fn set_breakpoints(&mut self, args: &SetBreakpointsArguments) -> SetBreakpointsResponseBody {
        let Some(path) = args.source.path.as_deref() else {
            let requested = args
                .breakpoints
                .as_ref()
                .map(|breakpoints| breakpoints.iter().map(|bp| bp.line).collect())
                .or_else(|| args.lines.clone())
                .unwrap_or_default();
            return SetBreakpointsResponseBody {
                breakpoints: requested
                    .into_iter()
                    .map(|line| {
                        Breakpoint::unverified(line, None, Some(MSG_MISSING_SOURCE.to_string()))
                    })
                    .collect(),
            };
        };

        let lines: BTreeSet<u32> = args
            .breakpoints
            .as_ref()
            .map(|breakpoints| breakpoints.iter().map(|bp| bp.line).collect())
            .or_else(|| args.lines.as_ref().map(|lines| lines.iter().copied().collect()))
            .unwrap_or_default();

        // The set for a file replaces wholesale on every request.
        self.breakpoints.insert(
            normalize_path(path),
            FileBreakpoints {
                client_path: path.to_string(),
                lines: lines.clone(),
            },
        );
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_breakpoints(path, &lines);
        }

        SetBreakpointsResponseBody {
            breakpoints: self.verify_lines(path, &lines),
        }
    }

    fn continue_run(&mut self) -> bool {
        match self.adapter.as_ref() {
            Some(adapter) => {
                adapter.continue_run();
                true
            }
            None => false,
        }
    }

    fn step_over(&mut self) -> bool {
        match self.adapter.as_ref() {
            Some(adapter) => {
                adapter.step_over();
                true
            }
            None => false,
        }
    }

    fn step_in(&mut self) -> bool {
        match self.adapter.as_ref() {
            Some(adapter) => {
                adapter.step_in();
                true
            }
            None => false,
        }
    }

    fn step_out(&mut self) -> bool {
        match self.adapter.as_ref() {
            Some(adapter) => {
                adapter.step_out();
                true
            }
            None => false,
        }
    }

    fn detach(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            adapter.detach();
        }
    }

    fn has_active_run(&self) -> bool {
        self.adapter.is_some()
    }

    fn last_stop(&self) -> Option<RunStop> {
        self.adapter.as_ref()?.control().last_stop()
    }

    fn variables(&self) -> IndexMap<SmolStr, String> {
        self.adapter
            .as_ref()
            .map(|adapter| adapter.control().variables())
            .unwrap_or_default()
    }

    fn evaluate(&self, expression: &str) -> Option<String> {
        self.last_stop()?.node?.select(expression)
    }
}

fn rules_for_version(version: Option<&str>) -> DialectRules {
    let major = version
        .and_then(|version| version.split('.').next())
        .and_then(|major| major.parse::<u32>().ok());
    if major.is_some_and(|major| major >= 2) {
        DialectRules::v3()
    } else {
        DialectRules::v1()
    }
}

fn launch_string(args: &LaunchArguments, key: &str) -> Option<String> {
    args.additional
        .get(key)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}

fn launch_path(args: &LaunchArguments, keys: &[&str]) -> Option<PathBuf> {
    keys.iter()
        .find_map(|key| launch_string(args, key))
        .map(PathBuf::from)
}

fn launch_flag(args: &LaunchArguments, key: &str, default: bool) -> bool {
    args.additional
        .get(key)
        .and_then(|value| value.as_bool())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SourceBreakpoint;
    use std::sync::mpsc::channel;

    fn session() -> DebugSession {
        let mut session = DebugSession::new(EngineRegistry::new());
        let (log_tx, _) = channel();
        let (stop_tx, _) = channel();
        let (term_tx, _) = channel();
        session.set_sinks(RunSinks {
            log_tx,
            stop_tx,
            term_tx,
        });
        session
    }

    #[test]
    fn launch_with_unknown_engine_names_the_selector() {
        let mut session = session();
        let mut args = LaunchArguments::default();
        args.additional
            .insert("stylesheet".into(), "/tmp/a.xsl".into());
        args.additional.insert("input".into(), "/tmp/a.xml".into());
        args.additional.insert("engine".into(), "saxon-ee".into());

        let error = session.launch(&args).unwrap_err();
        assert!(error.contains("saxon-ee"), "{error}");
    }

    #[test]
    fn breakpoints_without_a_source_path_stay_unverified() {
        let mut session = session();
        let response = session.set_breakpoints(&SetBreakpointsArguments {
            source: Source {
                name: None,
                path: None,
                source_reference: None,
            },
            breakpoints: Some(vec![SourceBreakpoint {
                line: 5,
                column: None,
                condition: None,
            }]),
            lines: None,
            source_modified: None,
        });
        assert_eq!(response.breakpoints.len(), 1);
        assert!(!response.breakpoints[0].verified);
    }

    #[test]
    fn unreadable_stylesheet_leaves_breakpoints_unverified() {
        let mut session = session();
        let response = session.set_breakpoints(&SetBreakpointsArguments {
            source: Source::from_path("/nonexistent/sheet.xsl"),
            breakpoints: Some(vec![SourceBreakpoint {
                line: 3,
                column: None,
                condition: None,
            }]),
            lines: None,
            source_modified: None,
        });
        assert!(!response.breakpoints[0].verified);
        assert!(response.breakpoints[0]
            .message
            .as_deref()
            .unwrap_or_default()
            .contains("cannot read"));
    }
}
