use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("unsupported file format {extension:?} (supported: .pdf, .docx, .txt)")]
    UnsupportedFormat { extension: String },

    #[error("no text could be extracted from {0}")]
    EmptyContent(PathBuf),

    #[error("failed to decode {path}: {details}")]
    Decode { path: PathBuf, details: String },

    #[error("pdf parse error: {0}")]
    Pdf(String),

    #[error("docx parse error: {0}")]
    Docx(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub(crate) fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::InvalidData => Self::Decode {
                path: path.to_path_buf(),
                details: error.to_string(),
            },
            _ => Self::Io(error),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("prompt is empty: {0}")]
    EmptyPrompt(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no structured block found in model output")]
    NoStructuredBlock,

    #[error("structured block starting at byte {0} is never closed")]
    UnbalancedBlock(usize),

    #[error("malformed json in model output: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("structured block is not a json object")]
    NotAnObject,

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("text of {0} characters produced no chunks to embed")]
    NoChunks(usize),

    #[error("embedding response had no vector")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("vector dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no rfp has been analyzed in this session yet")]
    NoActiveAnalysis,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
