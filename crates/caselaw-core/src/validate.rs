//! Content gate applied before and after chunking.

/// Upper bound (exclusive) on trimmed text length, in characters.
///
/// Keeps inputs inside the embedding model's input window.
pub const MAX_CONTENT_CHARS: usize = 8192;

/// True iff `text` is non-empty after trimming and shorter than [`MAX_CONTENT_CHARS`].
pub fn is_valid_content(text: &str) -> bool {
    is_valid_content_within(text, MAX_CONTENT_CHARS)
}

/// Like [`is_valid_content`] with a caller-supplied bound.
pub fn is_valid_content_within(text: &str, max_chars: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.chars().count() < max_chars
}
