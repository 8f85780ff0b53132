//! PDF text extraction, one string per page.
//!
//! Extraction never panics: a malformed file yields an [`ExtractError`]
//! and the loader skips it.

/// Extraction error.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Empty,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "PDF has no pages"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text of every page of a PDF held in memory.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some unsupported font encodings.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if pages.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        let err = extract_pdf_pages(b"definitely not a pdf").unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }
}
