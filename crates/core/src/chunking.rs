use crate::error::IngestError;
use crate::models::{Chunk, Document, IngestionOptions};
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::InvalidConfiguration(format!(
                "overlap {overlap} must be smaller than chunk size {chunk_size}"
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

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let options = IngestionOptions::default();
        Self {
            chunk_size: options.chunk_size,
            overlap: options.chunk_overlap,
        }
    }
}

impl TryFrom<IngestionOptions> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

/// Splits a document into fixed-size, overlapping character windows.
///
/// The returned iterator is lazy and cheap to clone; cloning it before
/// consumption restarts the sequence. Empty or whitespace-only text yields
/// no chunks. Each window advances by `chunk_size - overlap` characters and
/// the sequence stops at the first window that reaches the end of the text,
/// so a text no longer than `chunk_size` yields exactly one chunk.
pub fn chunk_document(document: &Document, config: ChunkingConfig) -> Chunks<'_> {
    Chunks {
        text: &document.text,
        source_id: &document.source_id,
        config,
        start_char: 0,
        start_byte: 0,
        next_index: 0,
        finished: document.text.trim().is_empty(),
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    source_id: &'a str,
    config: ChunkingConfig,
    start_char: usize,
    start_byte: usize,
    next_index: usize,
    finished: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.start_byte >= self.text.len() {
            self.finished = true;
            return None;
        }

        let rest = &self.text[self.start_byte..];
        let (taken, end_rel) = advance_chars(rest, self.config.chunk_size);

        let chunk = Chunk {
            text: &rest[..end_rel],
            start_offset: self.start_char,
            end_offset: self.start_char + taken,
            source_id: self.source_id,
            sequence_index: self.next_index,
        };
        self.next_index += 1;

        if end_rel == rest.len() {
            self.finished = true;
        } else {
            let step = self.config.step();
            let (_, step_rel) = advance_chars(rest, step);
            self.start_byte += step_rel;
            self.start_char += step;
        }

        Some(chunk)
    }
}

impl FusedIterator for Chunks<'_> {}

/// Moves up to `count` characters into `text`, returning how many were
/// consumed and the byte offset reached.
fn advance_chars(text: &str, count: usize) -> (usize, usize) {
    match text.char_indices().nth(count) {
        Some((byte, _)) => (count, byte),
        None => (text.chars().count(), text.len()),
    }
}
