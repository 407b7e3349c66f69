//! Object Store Adapter (spec.md §4.9).
//!
//! No pack example depends on an S3 SDK, so chunk storage is reached over
//! plain HTTP via `reqwest`, the same HTTP client crate used for the LLM
//! adapter in `recap/llm.rs`.

use async_trait::async_trait;
use reqwest::Client;
use sessionhub_types::UserId;

use crate::error::StoreError;
use crate::parsers::assembler::{chunk_prefix, parse_chunk_range, ChunkRef};

/// `list_chunks`/`download` (spec.md §4.9). No write operations: uploads are
/// an external collaborator.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_chunks(
        &self,
        user: UserId,
        external_id: &str,
        filename: &str,
    ) -> Result<Vec<ChunkRef>, StoreError>;
}

/// HTTP-backed object store: `base_url` fronts a chunk-serving endpoint that
/// returns a JSON directory listing plus byte ranges on request.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct ChunkListing {
    keys: Vec<String>,
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list_chunks(
        &self,
        user: UserId,
        external_id: &str,
        filename: &str,
    ) -> Result<Vec<ChunkRef>, StoreError> {
        let prefix = chunk_prefix(user, external_id, filename);
        let listing_url = format!("{}/list?prefix={}", self.base_url, prefix);

        let response = self.client.get(&listing_url).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::ObjectStoreStatus {
                key: prefix,
                status: response.status().as_u16(),
            });
        }
        let listing: ChunkListing = response.json().await?;

        let mut chunks = Vec::with_capacity(listing.keys.len());
        for key in listing.keys {
            let (start, end) = parse_chunk_range(&key)?;
            let object_url = format!("{}/object/{}", self.base_url, key);
            let object_response = self.client.get(&object_url).send().await?;
            if !object_response.status().is_success() {
                return Err(StoreError::ObjectStoreStatus {
                    key,
                    status: object_response.status().as_u16(),
                });
            }
            let bytes = object_response.bytes().await?.to_vec();
            chunks.push(ChunkRef { start, end, bytes });
        }
        Ok(chunks)
    }
}
