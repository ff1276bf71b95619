use crate::embeddings::{Embedder, TrigramEmbedder};
use crate::traits::{ChunkStore, Retriever};
use crate::{Chunk, RetrievedMatch, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

const BACKEND: &str = "qdrant";

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    embedder: TrigramEmbedder,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        embedder: TrigramEmbedder,
    ) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            embedder,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.endpoint, self.collection, suffix)
    }

    /// Creates the collection with cosine distance if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let existing = self.client.get(self.collection_url("")).send().await?;
        if existing.status().is_success() {
            return Ok(());
        }
        if existing.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(existing.status()));
        }

        let response = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": {
                    "size": self.embedder.dimensions(),
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;
        check(response).await.map(|_| ())
    }
}

fn backend_error(status: StatusCode) -> StoreError {
    StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details: status.to_string(),
    }
}

async fn check(response: Response) -> Result<Value, StoreError> {
    if !response.status().is_success() {
        return Err(backend_error(response.status()));
    }
    Ok(response.json().await?)
}

/// Reads scored or scrolled points found at `pointer` into ranked matches.
fn parse_points(body: &Value, pointer: &str) -> Vec<RetrievedMatch> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|points| points.as_slice())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(rank, point)| RetrievedMatch {
            text: point
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: point.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            rank,
            source_id: point
                .pointer("/payload/source_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sequence_index: point
                .pointer("/payload/sequence_index")
                .and_then(Value::as_u64)
                .unwrap_or_default() as usize,
        })
        .collect()
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn embed_and_store(&self, chunks: &[Chunk<'_>]) -> Result<usize, StoreError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let stored_at = Utc::now().to_rfc3339();
        let points = chunks
            .iter()
            .map(|chunk| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": self.embedder.embed(chunk.text),
                    "payload": {
                        "source_id": chunk.source_id,
                        "sequence_index": chunk.sequence_index,
                        "start_offset": chunk.start_offset,
                        "end_offset": chunk.end_offset,
                        "text": chunk.text,
                        "stored_at": stored_at,
                    },
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        check(response).await?;

        Ok(chunks.len())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let response = self
            .client
            .post(self.collection_url("/points/count"))
            .json(&json!({ "exact": true }))
            .send()
            .await?;
        let body = check(response).await?;

        body.pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "count response has no result.count".to_string(),
            })
    }
}

#[async_trait]
impl Retriever for QdrantStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>, StoreError> {
        if query.trim().is_empty() {
            let response = self
                .client
                .post(self.collection_url("/points/scroll"))
                .json(&json!({
                    "limit": k,
                    "with_payload": true,
                    "with_vector": false,
                }))
                .send()
                .await?;
            let body = check(response).await?;
            return Ok(parse_points(&body, "/result/points"));
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": self.embedder.embed(query),
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;
        let body = check(response).await?;
        Ok(parse_points(&body, "/result"))
    }
}
