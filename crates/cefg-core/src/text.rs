//! Source text normalization.

/// Longest accepted source text, in characters.
pub const MAX_TEXT_LEN: usize = 5000;

/// Dedup key for a source text: trimmed and lowercased.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}
