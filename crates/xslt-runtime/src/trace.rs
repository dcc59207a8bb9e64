//! Diagnostic side-channel conventions.
//!
//! Engines that cannot invoke the dedicated trace callback still surface
//! variable values through their ordinary diagnostic stream: a message
//! starting with the trace tag followed by `name=value` is promoted into
//! the run's variable map instead of being forwarded as plain output.

/// Tag token opening a trace-bearing diagnostic message.
pub const TRACE_TAG: &str = "[xslt-trace]";

/// Split a diagnostic message into a `(name, value)` trace pair, if it
/// follows the side-channel convention.
#[must_use]
pub fn parse_trace_message(message: &str) -> Option<(&str, &str)> {
    let rest = message.trim_start().strip_prefix(TRACE_TAG)?.trim_start();
    let (name, value) = rest.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_tagged_messages() {
        assert_eq!(
            parse_trace_message("[xslt-trace] total=42"),
            Some(("total", "42"))
        );
        assert_eq!(
            parse_trace_message("  [xslt-trace] name=a=b"),
            Some(("name", "a=b"))
        );
    }

    #[test]
    fn forwards_everything_else() {
        assert_eq!(parse_trace_message("processing item 3"), None);
        assert_eq!(parse_trace_message("[xslt-trace] no-equals"), None);
        assert_eq!(parse_trace_message("[xslt-trace] =value"), None);
    }
}
