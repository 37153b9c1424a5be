//! Overlapping, structure-aware chunking for oversized documents
//!
//! Sizes and offsets are UTF-8 byte positions, always snapped to character
//! boundaries so every chunk is a valid `&str` slice of the input.

use regex::Regex;
use std::sync::LazyLock;

/// Default chunk size (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

/// Default overlap between consecutive chunks (bytes)
pub const DEFAULT_OVERLAP: usize = 1_000;

/// Default distance searched backward for a natural break (bytes)
pub const DEFAULT_SEARCH_WINDOW: usize = 500;

/// A contiguous slice of the cleaned document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

/// Line starts that make good cut points: blank-line paragraph breaks,
/// markdown headings, bullets and numbered items. Group 1 ends where the
/// next chunk should start.
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\n[ \t]*\n|\n)(?:#{1,6}\s|[-*+•]\s|\d{1,3}[.)]\s)|(\n[ \t]*\n)").expect("valid regex")
});

/// Splits text into overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    search_window: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
    }
}

impl TextChunker {
    /// Create a chunker; a zero `chunk_size` is treated as 1
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
            search_window: DEFAULT_SEARCH_WINDOW,
        }
    }

    /// Override how far back a natural break is searched for
    pub fn with_search_window(mut self, search_window: usize) -> Self {
        self.search_window = search_window;
        self
    }

    /// Chunk the given text
    ///
    /// Text no longer than the chunk size comes back as a single chunk.
    /// Otherwise every chunk ends at the nearest break within the search
    /// window before the raw boundary (or at the raw boundary when there is
    /// none), and the next chunk starts `overlap` bytes earlier, but always
    /// at least one character after the previous start. Chunk ends strictly
    /// increase, so no chunk lies inside its predecessor.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let len = text.len();
        if len <= self.chunk_size {
            return vec![Chunk {
                text: text.to_string(),
                start: 0,
                end: len,
            }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut previous_end = 0;

        loop {
            // Cuts at or before the previous end would repeat covered text
            let lower = start.max(previous_end);
            let mut end = floor_boundary(text, (start + self.chunk_size).min(len));
            if end <= lower {
                end = ceil_boundary(text, lower + 1);
            }

            if end < len {
                end = self.find_break(text, lower, end).unwrap_or(end);
            }

            chunks.push(Chunk {
                text: text[start..end].to_string(),
                start,
                end,
            });

            if end >= len {
                break;
            }

            previous_end = end;
            let floor = ceil_boundary(text, start + 1);
            start = ceil_boundary(text, end.saturating_sub(self.overlap)).max(floor);
        }

        chunks
    }

    /// Nearest break in the trailing window of `(lower, end)`, as a cut offset
    fn find_break(&self, text: &str, lower: usize, end: usize) -> Option<usize> {
        let window_start = ceil_boundary(text, end.saturating_sub(self.search_window).max(lower + 1));
        if window_start >= end {
            return None;
        }
        let window = &text[window_start..end];

        BREAK_RE
            .captures_iter(window)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| window_start + m.end())
            .filter(|cut| *cut > lower && *cut < end)
            .last()
    }
}

/// Split with the default chunk size and overlap
pub fn split(text: &str) -> Vec<Chunk> {
    TextChunker::default().split(text)
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(text: &str, chunks: &[Chunk], overlap: usize) {
        assert_eq!(chunks.first().map(|c| c.start), Some(0));
        assert_eq!(chunks.last().map(|c| c.end), Some(text.len()));
        for pair in chunks.windows(2) {
            assert!(pair[1].end > pair[0].end, "chunk inside its predecessor");
            assert!(pair[1].start <= pair[0].end, "gap between chunks");
            assert!(pair[1].start > pair[0].start, "no forward progress");
            assert!(pair[0].end - pair[1].start <= overlap, "overlap too large");
        }
        for chunk in chunks {
            assert_eq!(chunk.text, &text[chunk.start..chunk.end]);
        }
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for chunk in chunks {
            let skip = covered - chunk.start;
            out.push_str(&chunk.text[skip..]);
            covered = chunk.end;
        }
        out
    }

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.split("Short text here.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text here.");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 16));
    }

    #[test]
    fn test_empty_text() {
        let chunks = TextChunker::new(100, 10).split("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_cuts_after_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let chunks = TextChunker::new(100, 0).split(&text);
        assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(80)));
        assert!(chunks[1].text.starts_with('b'));
        assert_covers(&text, &chunks, 0);
    }

    #[test]
    fn test_heading_starts_next_chunk() {
        let text = format!("{}\n## Next section\n{}", "a".repeat(70), "b".repeat(60));
        let chunks = TextChunker::new(100, 0).split(&text);
        assert!(chunks[1].text.starts_with("## Next section"));
        assert_covers(&text, &chunks, 0);
    }

    #[test]
    fn test_list_markers_are_breaks() {
        let text = format!("{}\n- item one\n{}", "a".repeat(75), "c".repeat(60));
        let chunks = TextChunker::new(100, 0).split(&text);
        assert!(chunks[1].text.starts_with("- item one"));

        let text = format!("{}\n12. item\n{}", "a".repeat(75), "c".repeat(60));
        let chunks = TextChunker::new(100, 0).split(&text);
        assert!(chunks[1].text.starts_with("12. item"));
    }

    #[test]
    fn test_raw_cut_without_breaks() {
        let text = "a".repeat(250);
        let chunks = TextChunker::new(100, 20).split(&text);
        assert_eq!(chunks[0].end, 100);
        assert_eq!(chunks[1].start, 80);
        assert_covers(&text, &chunks, 20);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_not_smaller_than_chunk_terminates() {
        let text = "x".repeat(40);
        let chunks = TextChunker::new(10, 50).split(&text);
        // Each chunk starts one byte after the previous one
        assert_eq!(chunks[1].start, 1);
        assert_covers(&text, &chunks, 50);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_small_step_never_repeats_covered_text() {
        let text = "\na-a0*-**\n* \n";
        let chunks = TextChunker::new(4, 3).with_search_window(40).split(text);
        assert_covers(text, &chunks, 3);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_equal_to_chunk_size_with_breaks() {
        let text = "a\n\n- b\n\n- c\n\n- d\n\n- e";
        let chunks = TextChunker::new(10, 10).split(text);
        assert_eq!((chunks[0].start, chunks[0].end), (0, 8));
        assert_eq!(chunks.len(), 12);
        assert_covers(text, &chunks, 10);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_dense_breaks_make_no_redundant_chunks() {
        let text: String = (0..40)
            .map(|i| format!("Paragraph {} explains one idea in a sentence or two.\n\n- bullet {}\n", i, i))
            .collect();
        let chunks = TextChunker::new(300, 250).split(&text);
        assert_covers(&text, &chunks, 250);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "知识提取".repeat(40);
        let chunks = TextChunker::new(50, 7).split(&text);
        assert!(chunks.len() > 1);
        assert_covers(&text, &chunks, 7);
        assert_eq!(reconstruct(&chunks), text);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Chunks cover the whole text without gaps and overlap by at most `overlap`
        #[test]
        fn test_chunks_cover_text(
            text in "[a-z \n#\\-*0-9.é]{0,600}",
            chunk_size in 1usize..200,
            overlap in 0usize..250,
        ) {
            let chunks = TextChunker::new(chunk_size, overlap)
                .with_search_window(40)
                .split(&text);

            if text.len() <= chunk_size {
                prop_assert_eq!(chunks.len(), 1);
                prop_assert_eq!(&chunks[0].text, &text);
            } else {
                prop_assert_eq!(chunks[0].start, 0);
                prop_assert_eq!(chunks.last().unwrap().end, text.len());
                let mut rebuilt = String::new();
                let mut covered = 0;
                for pair in chunks.windows(2) {
                    prop_assert!(pair[1].start <= pair[0].end);
                    prop_assert!(pair[1].start > pair[0].start);
                    prop_assert!(pair[1].end > pair[0].end);
                    prop_assert!(pair[0].end - pair[1].start <= overlap);
                }
                for chunk in &chunks {
                    rebuilt.push_str(&chunk.text[covered - chunk.start..]);
                    covered = chunk.end;
                }
                prop_assert_eq!(rebuilt, text);
            }
        }
    }
}
