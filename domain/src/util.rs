//! Shared utility functions.

/// Shorten `s` for log output, cutting at a UTF-8 character boundary at or
/// below `max_bytes` and marking the cut with `…`.
pub fn preview(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
