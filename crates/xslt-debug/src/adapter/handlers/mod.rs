//! DAP request handlers grouped by area.
//! - initialize: initialize/launch/configurationDone
//! - breakpoints: setBreakpoints
//! - run_control: continue/next/stepIn/stepOut
//! - stack_trace / threads / scopes: stop inspection
//! - lifecycle: disconnect/terminate

mod breakpoints;
mod initialize;
mod lifecycle;
mod run_control;
mod scopes;
mod stack_trace;
mod threads;
