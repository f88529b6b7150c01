//! Gibberish Filter
//!
//! Cheap heuristic that catches obviously low-information input before it
//! costs a round trip to the QA service. False positives are acceptable.

/// Longest single token still treated as gibberish
const MAX_GIBBERISH_TOKEN_CHARS: usize = 3;

/// Whether `text` is too degenerate to send to the QA service
///
/// True when the trimmed input has no alphabetic character, or when it is a
/// single whitespace-delimited token of at most three characters.
#[must_use]
pub fn is_gibberish(text: &str) -> bool {
    let trimmed = text.trim();

    if !trimmed.chars().any(char::is_alphabetic) {
        return true;
    }

    let mut tokens = trimmed.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(only), None) => only.chars().count() <= MAX_GIBBERISH_TOKEN_CHARS,
        _ => false,
    }
}
