use crate::error::AssistantError;
use serde::{Deserialize, Serialize};

/// Returned instead of a generated answer when there is nothing to ground it on.
pub const NO_DOCUMENTS_ANSWER: &str = "No documents found. Please upload a PDF first.";

/// What the model is told to say when the context does not hold the answer.
pub const UNKNOWN_ANSWER: &str = "I don't know.";

/// Raw extracted text of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// A contiguous slice of a [`Document`]'s text.
///
/// Offsets count characters, not bytes. The chunk borrows from its document
/// and so cannot outlive the ingestion call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub text: &'a str,
    pub start_offset: usize,
    pub end_offset: usize,
    pub source_id: &'a str,
    pub sequence_index: usize,
}

impl Chunk<'_> {
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMatch {
    pub text: String,
    pub score: f32,
    pub rank: usize,
    pub source_id: String,
    pub sequence_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// Built from matches ranked against the question.
    Targeted,
    /// Built from an unfiltered broad sample because targeted retrieval found nothing.
    Fallback,
    /// Nothing usable; the generator must not be called.
    None,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Targeted => "targeted",
            ContextKind::Fallback => "fallback",
            ContextKind::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub kind: ContextKind,
    pub included: usize,
}

impl AssembledContext {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            kind: ContextKind::None,
            included: 0,
        }
    }

    pub fn is_answerable(&self) -> bool {
        self.kind != ContextKind::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Generated { text: String, context: ContextKind },
    NoDocuments,
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated { text, .. } => text,
            Answer::NoDocuments => NO_DOCUMENTS_ANSWER,
        }
    }

    pub fn context_kind(&self) -> ContextKind {
        match self {
            Answer::Generated { context, .. } => *context,
            Answer::NoDocuments => ContextKind::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub per_chunk_char_limit: usize,
    pub fallback_limit: usize,
    pub targeted_separator: String,
    pub fallback_separator: String,
}

impl AssemblyOptions {
    /// Default separators with the given limits; both limits must be positive.
    pub fn new(per_chunk_char_limit: usize, fallback_limit: usize) -> Result<Self, AssistantError> {
        if per_chunk_char_limit == 0 {
            return Err(AssistantError::InvalidOptions(
                "per-chunk character limit must be positive".to_string(),
            ));
        }
        if fallback_limit == 0 {
            return Err(AssistantError::InvalidOptions(
                "fallback limit must be positive".to_string(),
            ));
        }
        Ok(Self {
            per_chunk_char_limit,
            fallback_limit,
            ..Self::default()
        })
    }
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            per_chunk_char_limit: 400,
            fallback_limit: 8,
            targeted_separator: "\n\n".to_string(),
            fallback_separator: " ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AskOptions {
    pub top_k: usize,
    pub max_tokens: u32,
}

impl AskOptions {
    pub fn new(top_k: usize, max_tokens: u32) -> Result<Self, AssistantError> {
        if top_k == 0 {
            return Err(AssistantError::InvalidOptions(
                "top_k must be positive".to_string(),
            ));
        }
        if max_tokens == 0 {
            return Err(AssistantError::InvalidOptions(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(Self { top_k, max_tokens })
    }
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_tokens: 200,
        }
    }
}
