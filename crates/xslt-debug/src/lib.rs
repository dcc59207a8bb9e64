//! Debug Adapter Protocol (DAP) support for stylesheet transforms.

mod adapter;
mod protocol;
mod runtime;
mod session;

pub use adapter::DebugAdapter;
pub use protocol::{
    Breakpoint, Capabilities, ContinueArguments, ContinueResponseBody, DisconnectArguments,
    EvaluateArguments, EvaluateResponseBody, Event, ExitedEventBody, InitializeArguments,
    InitializeResponseBody, LaunchArguments, MessageType, NextArguments, OutputEventBody, Request,
    Response, Scope, ScopesArguments, ScopesResponseBody, SetBreakpointsArguments,
    SetBreakpointsResponseBody, Source, SourceBreakpoint, StackFrame, StackTraceArguments,
    StackTraceResponseBody, StepInArguments, StepOutArguments, StoppedEventBody,
    TerminateArguments, TerminatedEventBody, Thread, ThreadsResponseBody, Variable,
    VariablesArguments, VariablesResponseBody,
};
pub use runtime::DebugRuntime;
pub use session::DebugSession;
