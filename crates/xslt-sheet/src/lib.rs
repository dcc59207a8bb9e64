//! Stylesheet document model and probe instrumentation planning.
//!
//! The document tree keeps per-node source lines so the planner can tie
//! every injected probe back to the line a client sets breakpoints on.

mod dialect;
mod dom;
mod parse;
mod probe;
mod write;

pub use dialect::{
    classify, find_embedded_script, is_stylesheet_root, stylesheet_version, Dialect, DialectRules,
    ProbeKind, XslKind, PROBE_NAMESPACE, PROBE_PREFIX, XSLT_NAMESPACE,
};
pub use dom::{Attribute, Element, NodeId, QName, SheetDocument, SheetNode};
pub use parse::{parse_document, ParseError};
pub use probe::{plan, PlanError, PlanReport};
pub use write::write_document;
