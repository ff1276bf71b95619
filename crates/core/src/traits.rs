use crate::error::{GenerationError, StoreError};
use crate::models::{Chunk, RetrievedMatch};
use async_trait::async_trait;

#[async_trait]
pub trait ChunkStore {
    /// Embeds and stores the chunks, returning how many were written.
    ///
    /// Delivery is at-least-once; re-ingesting a document stores its chunks again.
    async fn embed_and_store(&self, chunks: &[Chunk<'_>]) -> Result<usize, StoreError>;

    async fn len(&self) -> Result<usize, StoreError>;

    /// Makes stored chunks durable. Stores that write through need not override it.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
pub trait Retriever {
    /// Returns up to `k` matches ordered by relevance.
    ///
    /// A blank query asks for an unfiltered broad sample of the store.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>, StoreError>;
}

#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;
}
