//! Truncation Utilities
//!
//! Keeps a prefix and a suffix of long text on UTF-8 boundaries, for log
//! lines and error messages that quote remote payloads.

use serde_json::Value;

/// Byte budget for payload previews in errors and logs.
pub const PREVIEW_BYTES: usize = 240;

/// Keep about `max_bytes` of `content`, half from each end, cutting only on
/// char boundaries. Budgets are bytes because previews end up in log lines
/// and error strings, not in a model context.
pub fn truncate_text(content: &str, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content.to_string();
    }

    let half = max_bytes / 2;
    let prefix_end = floor_boundary(content, half);
    let suffix_start = ceil_boundary(content, content.len() - half).max(prefix_end);

    let prefix = &content[..prefix_end];
    let suffix = &content[suffix_start..];
    let dropped = suffix_start - prefix_end;

    match (prefix.is_empty(), suffix.is_empty()) {
        (true, true) => format!("... [{} bytes truncated] ...", dropped),
        _ => format!("{} ... [{} bytes truncated] ... {}", prefix, dropped, suffix),
    }
}

/// Largest char boundary at or below `index`.
fn floor_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary at or above `index`.
fn ceil_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Compact JSON rendering cut down to `PREVIEW_BYTES`.
pub fn preview_json(value: &Value) -> String {
    truncate_text(&value.to_string(), PREVIEW_BYTES)
}
