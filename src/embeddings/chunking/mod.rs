
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for content chunking. Offsets and sizes are measured in
/// characters, not bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters of the previous chunk repeated at the start of the next
    /// one. Clamped to zero when it is not smaller than `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            overlap: 200,
        }
    }
}

/// A contiguous slice of a document's text, ready for embedding.
///
/// `start` and `end` are character offsets into the source text. Boundaries
/// are a pure function of (text, chunk_size, overlap): re-chunking identical
/// text always yields identical chunks in identical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Ordinal index within the document.
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Size in characters.
    #[inline]
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Splits text into overlapping fixed-size chunks with stable boundaries.
///
/// Split points land on character boundaries by construction. When a cut
/// would fall mid-word, the nearest preceding whitespace within a bounded
/// lookback window is preferred; a cut inside a markdown heading line moves
/// to the start of that line so the heading stays whole. Text shorter than
/// one chunk yields exactly one chunk; empty text yields none.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if text.is_empty() || config.chunk_size == 0 {
        return Vec::new();
    }

    // Work in char-index space; keep byte offsets around for slicing.
    let mut byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    byte_offsets.push(text.len());
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let size = config.chunk_size;
    let overlap = if config.overlap >= size {
        0
    } else {
        config.overlap
    };
    let lookback = (size / 8).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < total {
        let hard_end = (start + size).min(total);
        let cut = if hard_end == total {
            total
        } else {
            adjust_cut(&chars, start, hard_end, lookback)
        };

        let slice = text
            .get(byte_offsets[start]..byte_offsets[cut])
            .unwrap_or_default();
        chunks.push(Chunk {
            index,
            start,
            end: cut,
            text: slice.to_string(),
        });
        index += 1;

        if cut == total {
            break;
        }

        let mut next = cut.saturating_sub(overlap);
        if next <= start {
            // Forward progress over the overlap when chunks degenerate.
            next = cut;
        }
        start = next;
    }

    debug!(
        "Chunked {} chars into {} chunks (size={}, overlap={})",
        total,
        chunks.len(),
        size,
        overlap
    );

    chunks
}

/// Picks the actual split point for a cut that falls mid-text.
///
/// Guarantees `start < cut <= hard_end`.
fn adjust_cut(chars: &[char], start: usize, hard_end: usize, lookback: usize) -> usize {
    let mut cut = hard_end;

    // Structural token guard: a cut inside a heading line moves to the
    // start of that line.
    let line_start = (0..cut)
        .rev()
        .find(|&i| chars[i] == '\n')
        .map_or(0, |i| i + 1);
    if line_start > start && line_start < cut && chars[line_start] == '#' {
        cut = line_start;
    }

    // Mid-word cut: prefer the nearest preceding whitespace within the
    // lookback window.
    if cut == hard_end && !chars[cut].is_whitespace() && !chars[cut - 1].is_whitespace() {
        let floor = cut.saturating_sub(lookback).max(start + 1);
        if let Some(ws) = (floor..cut).rev().find(|&i| chars[i].is_whitespace()) {
            cut = ws + 1;
        }
    }

    cut.max(start + 1)
}
