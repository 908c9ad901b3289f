use crate::error::{GenerationError, StoreError};
use crate::models::{CompletionRequest, RfpDocument, SearchMatch};
use async_trait::async_trait;

pub use crate::embeddings::EmbeddingProvider;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait RfpIndex: Send + Sync {
    /// Creates the index, or updates its schema if it already exists.
    async fn ensure_index(&self) -> Result<(), StoreError>;

    /// `Ok(false)` when the store answered but did not accept the document.
    async fn upload_document(&self, document: &RfpDocument) -> Result<bool, StoreError>;

    async fn hybrid_search(
        &self,
        text: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError>;
}
