pub mod analyzer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod json_block;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod search;
pub mod session;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use analyzer::{parse_analysis, AnalyzerOptions, RfpAnalyzer, StructuredAnalysis};
pub use chunking::{char_len, split_into_chunks, DEFAULT_MAX_CHUNK_CHARS};
pub use embeddings::{
    mean_vector, EmbeddingAggregator, EmbeddingProvider, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{
    AnalysisError, EmbeddingError, ExtractionError, GenerationError, PipelineError, StoreError,
};
pub use extractor::{detect_format, extract_document};
pub use json_block::find_json_object;
pub use models::{
    CompletionRequest, DocumentFormat, EvaluationCriteria, ExtractedDocument, ExtractionWarning,
    RfpDocument, SearchMatch,
};
pub use pipeline::{
    analyze_and_store, discover_rfp_files, ingest_folder_best_effort, AnalyzedRfp,
    IngestionReport, RfpServices, SkippedFile, StorageOutcome,
};
pub use schema::{resolve_title, FlattenedFields, Requirement, RfpAnalysis, CATEGORY_CATALOGUE};
pub use search::{SimilarRfpSearch, DEFAULT_TOP_K};
pub use session::{example_question, QaExchange, Session, EXAMPLE_QUESTIONS};
pub use stores::{AzureOpenAiClient, AzureOpenAiConfig, AzureSearchConfig, AzureSearchStore};
pub use traits::{RfpIndex, TextGenerator};
