//! Human-readable rendering of modem traffic
//!
//! Responses are collapsed onto one line before they go into a step log or a
//! log message, so multi-line modem output stays readable.

/// Maximum characters kept from a sanitized response
pub const MAX_SANITIZED_CHARS: usize = 150;

/// Collapse whitespace and control characters, trim, and cap the length
pub fn sanitize(text: &str) -> String {
    let collapsed = text
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    match collapsed.char_indices().nth(MAX_SANITIZED_CHARS) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// Format one `"<command> -> <response>"` step entry
pub fn step_entry(command: &str, response: &str) -> String {
    format!("{} -> {}", command, sanitize(response))
}

/// Format one `"<command> -> ERROR: <reason>"` step entry
pub fn step_error(command: &str, reason: &str) -> String {
    format!("{} -> ERROR: {}", command, sanitize(reason))
}
