//! Per-user working state: the document being looked at, the last answer and
//! the last similarity search.

use crate::embeddings::EmbeddingProvider;
use crate::error::{PipelineError, Result};
use crate::extractor::extract_document;
use crate::models::{ExtractedDocument, SearchMatch};
use crate::pipeline::{analyze_and_store, analyze_extracted, AnalyzedRfp, RfpServices};
use crate::traits::{RfpIndex, TextGenerator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ready-made questions offered to users who do not know where to start.
pub const EXAMPLE_QUESTIONS: [&str; 3] = [
    "이 RFP의 주요 목적은 무엇인가요?",
    "프로젝트 일정은 어떻게 되어 있나요?",
    "예산 범위는 얼마인가요?",
];

/// 1-based lookup into [`EXAMPLE_QUESTIONS`].
pub fn example_question(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| EXAMPLE_QUESTIONS.get(index))
        .copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaExchange {
    pub question: String,
    pub answer: String,
}

pub struct Session<G, E, S> {
    services: RfpServices<G, E, S>,
    current: Option<AnalyzedRfp>,
    last_answer: Option<QaExchange>,
    last_search: Vec<SearchMatch>,
}

impl<G, E, S> Session<G, E, S>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    pub fn new(services: RfpServices<G, E, S>) -> Self {
        Self {
            services,
            current: None,
            last_answer: None,
            last_search: Vec::new(),
        }
    }

    /// Swaps in new services and forgets everything the session held.
    pub fn reinitialize(&mut self, services: RfpServices<G, E, S>) {
        *self = Self::new(services);
    }

    pub fn services(&self) -> &RfpServices<G, E, S> {
        &self.services
    }

    pub fn current(&self) -> Option<&AnalyzedRfp> {
        self.current.as_ref()
    }

    pub fn last_answer(&self) -> Option<&QaExchange> {
        self.last_answer.as_ref()
    }

    pub fn last_search(&self) -> &[SearchMatch] {
        &self.last_search
    }

    pub fn clear_answer(&mut self) {
        self.last_answer = None;
    }

    /// On success the new document replaces the current one and any answer
    /// about the previous document is dropped. On failure nothing changes.
    pub async fn analyze_file(&mut self, path: &Path, store: bool) -> Result<&AnalyzedRfp> {
        let analyzed = analyze_and_store(&self.services, path, store).await?;
        Ok(self.replace_current(analyzed))
    }

    /// Same as [`Session::analyze_file`] for in-memory bytes, e.g. an upload.
    pub async fn analyze_upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        store: bool,
    ) -> Result<&AnalyzedRfp> {
        let document = extract_upload(file_name, bytes)?;
        let analyzed =
            analyze_extracted(&self.services, PathBuf::from(file_name), document, store).await?;
        Ok(self.replace_current(analyzed))
    }

    pub async fn ask(&mut self, question: &str) -> Result<&QaExchange> {
        let current = self.current.as_ref().ok_or(PipelineError::NoActiveAnalysis)?;

        let answer = self
            .services
            .analyzer
            .answer(question, &current.document.text, Some(&current.analysis.raw))
            .await?;

        let exchange = QaExchange {
            question: question.trim().to_string(),
            answer,
        };
        Ok(&*self.last_answer.insert(exchange))
    }

    pub async fn search_similar(&mut self, query: &str, top_k: usize) -> Result<&[SearchMatch]> {
        let matches = self.services.similar().search(query, top_k).await?;
        self.last_search = matches;
        Ok(&self.last_search)
    }

    fn replace_current(&mut self, analyzed: AnalyzedRfp) -> &AnalyzedRfp {
        self.last_answer = None;
        &*self.current.insert(analyzed)
    }
}

/// Writes `bytes` to a fresh temporary directory under the upload's own file
/// name, extracts it and removes the directory again, whatever the outcome.
pub fn extract_upload(file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument> {
    extract_upload_in(&std::env::temp_dir(), file_name, bytes)
}

pub fn extract_upload_in(
    parent: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<ExtractedDocument> {
    let name = Path::new(file_name).file_name().ok_or_else(|| {
        PipelineError::InvalidArgument(format!("invalid upload name {file_name:?}"))
    })?;

    let dir = tempfile::Builder::new().prefix("rfp-upload-").tempdir_in(parent)?;
    let path = dir.path().join(name);
    debug!(path = %path.display(), bytes = bytes.len(), "staging upload");

    let extracted = fs::write(&path, bytes)
        .map_err(PipelineError::from)
        .and_then(|()| extract_document(&path).map_err(PipelineError::from));

    if let Err(error) = dir.close() {
        warn!(error = %error, "failed to remove upload staging directory");
    }

    extracted
}
