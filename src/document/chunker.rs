//! Overlapping text chunker.
//!
//! Splits text into windows of at most `chunk_size` characters where each
//! window starts exactly `overlap` characters before the previous one
//! ended. Window ends prefer natural boundaries, tried in order:
//! paragraph break, line break, sentence end, word gap. Without any of
//! those in the back half of the window, the cut is hard.
//!
//! Sizes are counted in `char`s, so multi-byte text is never split
//! inside a code point.

use crate::models::{QuizError, Result};

/// Boundaries, most preferred first. A cut lands right after one.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Deterministic overlapping splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker.
    ///
    /// B_i(0 < overlap + 1 <= chunk_size) → Result
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(QuizError::InvalidInput(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(QuizError::InvalidInput(format!(
                "chunk overlap ({overlap}) must be below chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            if total - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let hard_end = start + self.chunk_size;
            // Every cut must leave the next window starting past `start`.
            let earliest = (start + self.overlap + 1).max(start + self.chunk_size / 2);
            let end = find_boundary(&chars, earliest, hard_end).unwrap_or(hard_end);

            chunks.push(chars[start..end].iter().collect());
            start = end - self.overlap;
        }

        chunks
    }
}

/// Last position in `[earliest, latest]` right after the most preferred
/// separator that occurs there.
fn find_boundary(chars: &[char], earliest: usize, latest: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|sep| {
        let sep: Vec<char> = sep.chars().collect();
        (earliest..=latest)
            .rev()
            .find(|&end| end >= sep.len() && chars[end - sep.len()..end] == sep[..])
    })
}

/// Join the first `max_chunks` chunks with a single space.
///
/// This is the sample sent to the model; later chunks are not covered.
pub fn sample_chunks(chunks: &[String], max_chunks: usize) -> String {
    chunks
        .iter()
        .take(max_chunks)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        let mut text = String::new();
        for para in 0..12 {
            for sentence in 0..6 {
                text.push_str(&format!(
                    "Paragraph {para} sentence {sentence} talks about cells and energy. "
                ));
            }
            text.push_str("\n\n");
        }
        text
    }

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(100, 150).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_and_short_text() {
        let chunker = TextChunker::new(50, 10).unwrap();
        assert!(chunker.split("").is_empty());
        assert_eq!(chunker.split("short text"), vec!["short text".to_string()]);
    }

    #[test]
    fn test_size_overlap_and_reconstruction() {
        let text = sample_text();
        for (size, overlap) in [(800, 100), (1200, 240), (2400, 600), (120, 20), (60, 59)] {
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.split(&text);

            assert!(chunks.len() > 1, "size={size} overlap={overlap}");
            for chunk in &chunks {
                assert!(chunk.chars().count() <= size, "size={size} overlap={overlap}");
            }
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                assert_eq!(
                    prev[prev.len() - overlap..],
                    next[..overlap],
                    "size={size} overlap={overlap}"
                );
            }
            assert_eq!(reconstruct(&chunks, overlap), text);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(70), "b".repeat(70));
        let chunker = TextChunker::new(100, 10).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks[0], format!("{}\n\n", "a".repeat(70)));
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(250);
        let chunker = TextChunker::new(100, 20).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 100);
        assert_eq!(chunks[2].len(), 90);
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Fotosíntesis convierte energía lumínica en química. ".repeat(20);
        let chunker = TextChunker::new(80, 16).unwrap();
        let chunks = chunker.split(&text);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80);
        }
        assert_eq!(reconstruct(&chunks, 16), text);
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let chunker = TextChunker::new(300, 60).unwrap();
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }

    #[test]
    fn test_sample_chunks_takes_first_three() {
        let chunks: Vec<String> = ["one", "two", "three", "four"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sample_chunks(&chunks, 3), "one two three");
        assert_eq!(sample_chunks(&chunks[..2], 3), "one two");
        assert_eq!(sample_chunks(&[], 3), "");
    }
}
