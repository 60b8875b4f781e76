//! Fixed-width chunking
//!
//! Splits a corpus into consecutive, non-overlapping windows of `size`
//! characters. Windows ignore word and line boundaries; the last window holds
//! the remainder. Each chunk is labelled with the file whose header most
//! recently precedes it, when the corpus carries file headers.

use crate::ingest::corpus::{self, FileSection};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// A contiguous slice of the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Verbatim text of the window
    pub text: String,
    /// Character offset of the first character in the corpus
    pub offset: usize,
    /// Source file the window starts in, if known
    pub label: Option<String>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, offset: usize, label: Option<String>) -> Self {
        Self {
            text: text.into(),
            offset,
            label,
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Resolves the label for increasing byte offsets
struct LabelCursor {
    sections: Vec<FileSection>,
    next: usize,
}

impl LabelCursor {
    fn new(sections: Vec<FileSection>) -> Self {
        Self { sections, next: 0 }
    }

    fn label_at(&mut self, byte_offset: usize) -> Option<String> {
        while self.next < self.sections.len() && self.sections[self.next].start <= byte_offset {
            self.next += 1;
        }
        self.next
            .checked_sub(1)
            .map(|i| self.sections[i].path.clone())
    }
}

/// Split `corpus` into windows of `size` characters.
///
/// An empty corpus yields no chunks. Concatenating the returned texts in
/// order reproduces `corpus` exactly.
pub fn chunk(corpus: &str, size: NonZeroUsize) -> Vec<Chunk> {
    let size = size.get();
    let mut labels = LabelCursor::new(corpus::file_sections(corpus));
    let mut chunks = Vec::with_capacity(corpus.len() / size + 1);

    let mut start_byte = 0;
    let mut start_char = 0;
    let mut count = 0;

    for (byte_idx, _) in corpus.char_indices() {
        if count == size {
            chunks.push(Chunk::new(
                &corpus[start_byte..byte_idx],
                start_char,
                labels.label_at(start_byte),
            ));
            start_byte = byte_idx;
            start_char += count;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        chunks.push(Chunk::new(
            &corpus[start_byte..],
            start_char,
            labels.label_at(start_byte),
        ));
    }

    tracing::debug!(chunks = chunks.len(), size, "chunked corpus");
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn concat(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_corpus() {
        assert!(chunk("", size(600)).is_empty());
    }

    #[test]
    fn test_1300_chars_make_three_chunks() {
        let text = "abcdefghij".repeat(130);
        let chunks = chunk(&text, size(600));

        let lengths: Vec<usize> = chunks.iter().map(Chunk::char_len).collect();
        assert_eq!(lengths, vec![600, 600, 100]);
        assert_eq!(chunks[1].offset, 600);
        assert_eq!(chunks[2].offset, 1200);
        assert_eq!(concat(&chunks), text);
    }

    #[test]
    fn test_coverage_across_sizes() {
        let corpora = [
            "a",
            "fn main() {\n    println!(\"hello\");\n}\n",
            "exactly ten",
            "ünïcödé ✓ 日本語のテキスト and ascii mixed in 🦀🦀🦀",
        ];
        for text in corpora {
            for s in 1..=13 {
                let chunks = chunk(text, size(s));
                assert_eq!(concat(&chunks), text, "size {s}");
                assert!(chunks.iter().all(|c| (1..=s).contains(&c.char_len())));

                let mut expected_offset = 0;
                for c in &chunks {
                    assert_eq!(c.offset, expected_offset);
                    expected_offset += c.char_len();
                }
            }
        }
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let chunks = chunk("abcdef", size(3));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "def");
    }

    #[test]
    fn test_labels_follow_file_headers() {
        let mut text = String::from("preamble\n");
        corpus::write_file_section(&mut text, "src/a.rs", &"a".repeat(200));
        corpus::write_file_section(&mut text, "src/b.rs", &"b".repeat(200));

        let chunks = chunk(&text, size(100));
        assert_eq!(chunks[0].label, None);

        let first_b = chunks
            .iter()
            .position(|c| c.text.contains('b') && c.label.as_deref() == Some("src/b.rs"))
            .unwrap();
        assert!(chunks[1..first_b]
            .iter()
            .all(|c| c.label.as_deref() == Some("src/a.rs")));
        assert_eq!(
            chunks.last().unwrap().label.as_deref(),
            Some("src/b.rs")
        );
    }
}
