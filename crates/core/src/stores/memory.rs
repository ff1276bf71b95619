use crate::embeddings::{cosine_similarity, Embedder, TrigramEmbedder};
use crate::traits::{ChunkStore, Retriever};
use crate::{Chunk, RetrievedMatch, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_MIN_SCORE: f32 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    source_id: String,
    sequence_index: usize,
    start_offset: usize,
    end_offset: usize,
    text: String,
    embedding: Vec<f32>,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    dimensions: usize,
    chunks: Vec<StoredChunk>,
}

/// Exhaustive cosine-similarity index held in memory.
///
/// When opened from a path, [`MemoryStore::persist`] writes the index back
/// as JSON so it survives restarts.
#[derive(Debug)]
pub struct MemoryStore {
    path: Option<PathBuf>,
    embedder: TrigramEmbedder,
    min_score: f32,
    entries: RwLock<Vec<StoredChunk>>,
}

impl MemoryStore {
    pub fn in_memory(embedder: TrigramEmbedder) -> Self {
        Self {
            path: None,
            embedder,
            min_score: DEFAULT_MIN_SCORE,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Loads the index at `path`, or starts an empty one if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, embedder: TrigramEmbedder) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let file: IndexFile = serde_json::from_slice(&fs::read(&path)?)?;
            if file.dimensions != embedder.dimensions() {
                return Err(StoreError::DimensionMismatch {
                    expected: embedder.dimensions(),
                    actual: file.dimensions,
                });
            }
            file.chunks
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            embedder,
            min_score: DEFAULT_MIN_SCORE,
            entries: RwLock::new(entries),
        })
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the index to its backing file. A purely in-memory store is a no-op.
    pub fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let chunks = self.read()?.clone();
        let file = IndexFile {
            dimensions: self.embedder.dimensions(),
            chunks,
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(&file)?)?;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredChunk>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Request("memory index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredChunk>>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Request("memory index lock poisoned".to_string()))
    }
}

fn to_match(entry: &StoredChunk, score: f32, rank: usize) -> RetrievedMatch {
    RetrievedMatch {
        text: entry.text.clone(),
        score,
        rank,
        source_id: entry.source_id.clone(),
        sequence_index: entry.sequence_index,
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn embed_and_store(&self, chunks: &[Chunk<'_>]) -> Result<usize, StoreError> {
        let stored_at = Utc::now();
        let stored = chunks
            .iter()
            .map(|chunk| StoredChunk {
                source_id: chunk.source_id.to_string(),
                sequence_index: chunk.sequence_index,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
                text: chunk.text.to_string(),
                embedding: self.embedder.embed(chunk.text),
                stored_at,
            })
            .collect::<Vec<_>>();

        let count = stored.len();
        self.write()?.extend(stored);
        Ok(count)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.persist()
    }
}

#[async_trait]
impl Retriever for MemoryStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>, StoreError> {
        let entries = self.read()?;

        if query.trim().is_empty() {
            return Ok(entries
                .iter()
                .take(k)
                .enumerate()
                .map(|(rank, entry)| to_match(entry, 0.0, rank))
                .collect());
        }

        let query_vector = self.embedder.embed(query);
        let mut scored = entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.embedding), entry))
            .filter(|(score, _)| *score >= self.min_score)
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (score, entry))| to_match(entry, score, rank))
            .collect())
    }
}
