/// First `max_chars` characters of `s`, without any marker.
#[must_use]
pub fn prefix_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keep the first `max_chars` characters and append a truncation marker.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    let head = prefix_chars(s, max_chars);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{head}\n... [truncated]")
    }
}

/// Clip `s` so the result, marker included, stays near `max_chars`.
#[must_use]
pub fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head = prefix_chars(s, max_chars.saturating_sub(12));
    format!("{head}\n...[truncated]")
}
