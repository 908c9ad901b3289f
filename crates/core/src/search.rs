use crate::embeddings::{EmbeddingAggregator, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use crate::models::SearchMatch;
use crate::traits::RfpIndex;
use tracing::info;

pub const DEFAULT_TOP_K: usize = 5;

/// Finds previously stored RFPs similar to a query string or keyword list.
pub struct SimilarRfpSearch<'a, E, S> {
    embedder: &'a EmbeddingAggregator<E>,
    index: &'a S,
}

impl<'a, E, S> SimilarRfpSearch<'a, E, S>
where
    E: EmbeddingProvider,
    S: RfpIndex,
{
    pub fn new(embedder: &'a EmbeddingAggregator<E>, index: &'a S) -> Self {
        Self { embedder, index }
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidArgument("search query is empty".to_string()));
        }
        if top_k == 0 {
            return Err(PipelineError::InvalidArgument("top_k must be at least 1".to_string()));
        }

        let vector = self.embedder.embed(query).await?;
        let matches = self.index.hybrid_search(query, &vector, top_k).await?;

        info!(query, top_k, matches = matches.len(), "similar rfp search");
        Ok(matches)
    }

    /// Keywords are joined with single spaces into one query.
    pub async fn search_keywords(
        &self,
        keywords: &[String],
        top_k: usize,
    ) -> Result<Vec<SearchMatch>> {
        let query = keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        self.search(&query, top_k).await
    }
}
