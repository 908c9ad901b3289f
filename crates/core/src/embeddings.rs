use crate::chunking::{char_len, split_into_chunks, DEFAULT_MAX_CHUNK_CHARS};
use crate::error::EmbeddingError;
use async_trait::async_trait;
use tracing::{debug, info};

/// Output size of `text-embedding-ada-002`, which the index schema is built for.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1_536;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;

    /// One request, one vector. No chunking happens at this level.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Produces exactly one vector per text, however long the text is.
///
/// Text within `max_chunk_chars` is embedded with a single request. Longer
/// text is chunked, every chunk is embedded in document order and the chunk
/// vectors are averaged element-wise. A failed request aborts the whole run.
pub struct EmbeddingAggregator<E> {
    provider: E,
    max_chunk_chars: usize,
}

impl<E> EmbeddingAggregator<E>
where
    E: EmbeddingProvider,
{
    pub fn new(provider: E) -> Self {
        Self::with_max_chunk_chars(provider, DEFAULT_MAX_CHUNK_CHARS)
    }

    pub fn with_max_chunk_chars(provider: E, max_chunk_chars: usize) -> Self {
        Self {
            provider,
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    pub fn provider(&self) -> &E {
        &self.provider
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let length = char_len(text);

        if length <= self.max_chunk_chars {
            return self.embed_checked(text).await;
        }

        let chunks = split_into_chunks(text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(EmbeddingError::NoChunks(length));
        }

        info!(
            characters = length,
            chunk_count = chunks.len(),
            "text exceeds embedding limit, embedding chunk by chunk"
        );

        let mut vectors = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            debug!(chunk = index + 1, of = chunks.len(), "embedding chunk");
            vectors.push(self.embed_checked(chunk).await?);
        }

        mean_vector(&vectors).ok_or(EmbeddingError::NoChunks(length))
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.provider.embed_one(text).await?;
        let expected = self.provider.dimensions();

        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}

/// Element-wise arithmetic mean. `None` for an empty set or ragged input.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dimensions = first.len();

    if vectors.iter().any(|vector| vector.len() != dimensions) {
        return None;
    }

    let mut sums = vec![0f64; dimensions];
    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Some(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}
