//! Fixed-window text chunker.
//!
//! Splits a record's text into overlapping windows measured in characters
//! (Unicode scalar values, not bytes or tokens). Windows start every
//! `window_size - overlap` characters; the last window may be shorter.
//! Identical input always yields identical chunks, including hashes.

use sha2::{Digest, Sha256};

use crate::models::{Chunk, ContentRecord};

pub const DEFAULT_WINDOW_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Split a content record into chunks.
pub fn split(record: &ContentRecord, window_size: usize, overlap: usize) -> Vec<Chunk> {
    chunk_text(
        &record.path.to_string_lossy(),
        &record.raw_text,
        window_size,
        overlap,
    )
}

/// Split `text` into windows of `window_size` characters overlapping by `overlap`.
///
/// Empty text produces no chunks. `overlap` is clamped below `window_size` so
/// the window always advances.
pub fn chunk_text(source_path: &str, text: &str, window_size: usize, overlap: usize) -> Vec<Chunk> {
    let window_size = window_size.max(1);
    let step = window_size - overlap.min(window_size - 1);

    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut ordinal = 0i64;

    while start < char_count {
        let end = (start + window_size).min(char_count);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(source_path, ordinal, piece));
        ordinal += 1;
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(source_path: &str, ordinal: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        source_path: source_path.to_string(),
        text: text.to_string(),
        ordinal,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text("a.md", "Hello, world!", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].source_path, "a.md");
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(chunk_text("a.md", "", 1000, 200).is_empty());
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text("a.md", &text, 10, 4);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcdefghij", "ghijklmnop", "mnopqrstuv", "stuvwxyz"]);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i as i64);
        }
    }

    #[test]
    fn exact_fit_has_no_trailing_sliver() {
        let text = "x".repeat(1000);
        let chunks = chunk_text("a.md", &text, 1000, 200);
        assert_eq!(chunks.len(), 1);

        let text = "x".repeat(1800);
        let chunks = chunk_text("a.md", &text, 1000, 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text.chars().count(), 1000);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(25);
        let chunks = chunk_text("a.md", &text, 10, 2);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks.last().unwrap().text.chars().last(), Some('é'));
    }

    #[test]
    fn deterministic() {
        let text = "Alpha beta gamma delta. ".repeat(200);
        let c1 = chunk_text("a.md", &text, 1000, 200);
        let c2 = chunk_text("a.md", &text, 1000, 200);
        assert_eq!(c1, c2);
    }

    #[test]
    fn overlap_clamped_below_window() {
        let chunks = chunk_text("a.md", "abcdef", 3, 10);
        // step clamps to 1
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[3].text, "def");
    }
}
