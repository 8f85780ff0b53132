//! Overlapping fixed-size text splitter.
//!
//! Splits enriched documents into [`Chunk`]s of at most `chunk_size`
//! characters. Consecutive chunks of the same document share exactly
//! `chunk_overlap` characters, so dropping the first `chunk_overlap`
//! characters of every chunk after the first and concatenating gives back
//! the original text.
//!
//! # Algorithm
//!
//! 1. Measure in characters (not bytes) so windows never split a code point.
//! 2. A window starting at `start` may end anywhere in
//!    `(start + max(overlap, size / 2), start + size]`.
//! 3. Inside that range, prefer to end just after a paragraph break
//!    (`\n\n`), then a line break, then a space; otherwise cut hard.
//! 4. The next window starts `overlap` characters before the previous end.
//!
//! Windows are not trimmed here; whitespace-only windows are left for the
//! content validator to reject.
//!
//! # Example
//!
//! ```rust
//! use caselaw_core::chunk::split_text;
//!
//! let windows = split_text("aaaa bbbb cccc dddd", 10, 3);
//! assert!(windows.iter().all(|w| w.text.chars().count() <= 10));
//! assert_eq!(windows[0].start, 0);
//! ```

use anyhow::{bail, Result};

use crate::models::{Chunk, EnrichedDocument};

/// Splitting parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingParams {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// A window of the source text with its character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Separators tried in order of preference when choosing a window end.
const SEPARATORS: [&[char]; 3] = [&['\n', '\n'], &['\n'], &[' ']];

/// Split `text` into overlapping windows.
///
/// Returns an empty vector for empty text. Callers are expected to pass
/// `chunk_overlap < chunk_size` (see [`ChunkingParams::new`]); an
/// out-of-range overlap is clamped so splitting always makes progress.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<TextWindow> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    if n == 0 || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = chunk_overlap.min(chunk_size - 1);

    let mut windows = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + chunk_size).min(n);
        let end = if hard_end == n {
            n
        } else {
            let min_end = start + overlap.max(chunk_size / 2) + 1;
            find_break(&chars, min_end.min(hard_end), hard_end).unwrap_or(hard_end)
        };

        windows.push(TextWindow {
            text: chars[start..end].iter().collect(),
            start,
            end,
        });

        if end == n {
            break;
        }
        start = end - overlap;
    }

    windows
}

/// Best window end in `[min_end, max_end]`: the position just after the
/// last occurrence of the most preferred separator.
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let len = sep.len();
        let mut end = max_end;
        while end >= min_end && end >= len {
            if &chars[end - len..end] == sep {
                return Some(end);
            }
            end -= 1;
        }
    }
    None
}

/// Split every document into chunks, preserving document order and
/// left-to-right order within each document.
///
/// Each chunk carries its parent's metadata unchanged.
pub fn split_documents(docs: &[EnrichedDocument], params: ChunkingParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in docs {
        let windows = split_text(&doc.text, params.chunk_size, params.chunk_overlap);
        for (i, w) in windows.into_iter().enumerate() {
            chunks.push(Chunk {
                text: w.text,
                metadata: doc.metadata.clone(),
                chunk_index: i,
                char_start: w.start,
                char_end: w.end,
            });
        }
    }
    chunks
}
