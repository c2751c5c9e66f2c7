use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Chunk, Document};

/// Splits document text into overlapping chunks, preferring semantic
/// boundaries: paragraph break, then line break, then sentence end, then
/// whitespace, then a hard character cut. Consecutive chunks share
/// `chunk_overlap` characters, and every character of the input lands in at
/// least one chunk.
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let spans = self.spans(&document.text);
        let chunks: Vec<Chunk> = spans
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| Chunk {
                id: Uuid::new_v4().to_string(),
                text: document.text[start..end].to_string(),
                source_page: document.page_for_offset(start),
                sequence_index: i,
                start_position: start,
                end_position: end,
            })
            .collect();
        log::info!("split {} into {} chunks", document.filename, chunks.len());
        chunks
    }

    /// Byte ranges of each chunk in `text`. Sizes and the overlap are
    /// measured in characters, the returned offsets are bytes.
    fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let total = chars.len();
        let byte_at = |pos: usize| if pos < total { chars[pos].0 } else { text.len() };

        let mut spans = Vec::new();
        if total == 0 {
            return spans;
        }

        let mut start = 0usize;
        loop {
            if total - start <= self.chunk_size {
                spans.push((byte_at(start), text.len()));
                break;
            }
            let cut = self.break_position(&chars, start, start + self.chunk_size);
            spans.push((byte_at(start), byte_at(cut)));
            start = cut - self.chunk_overlap;
        }
        spans
    }

    /// Best cut position in (start, limit], scanning each boundary class
    /// from the right. A candidate must leave the next chunk start past the
    /// overlap region, otherwise the chunk walk would stop advancing; when
    /// no boundary qualifies the cut falls through to the hard limit.
    fn break_position(&self, chars: &[(usize, char)], start: usize, limit: usize) -> usize {
        let min_cut = start + self.chunk_overlap + 1;
        let ch = |pos: usize| chars[pos].1;

        // paragraph breaks
        let mut j = limit;
        while j >= min_cut {
            if j >= 2 && ch(j - 1) == '\n' && ch(j - 2) == '\n' {
                return j;
            }
            j -= 1;
        }
        // line breaks
        let mut j = limit;
        while j >= min_cut {
            if ch(j - 1) == '\n' {
                return j;
            }
            j -= 1;
        }
        // sentence-ending punctuation followed by whitespace
        let mut j = limit;
        while j >= min_cut {
            if j >= 2 && matches!(ch(j - 2), '.' | '!' | '?') && ch(j - 1).is_whitespace() {
                return j;
            }
            j -= 1;
        }
        // any whitespace
        let mut j = limit;
        while j >= min_cut {
            if ch(j - 1).is_whitespace() {
                return j;
            }
            j -= 1;
        }
        limit
    }
}
