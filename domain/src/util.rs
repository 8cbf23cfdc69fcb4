//! Shared utility functions.

/// Shorten `s` to at most `max_chars` characters, marking the cut with `...`.
///
/// Works on characters rather than bytes so multi-byte text (case notes are
/// frequently not ASCII) is never split mid-character.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max_chars) {
        None => trimmed.to_string(),
        Some((cut, _)) => format!("{}...", trimmed[..cut].trim_end()),
    }
}
