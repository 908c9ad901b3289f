use crate::analyzer::{RfpAnalyzer, StructuredAnalysis};
use crate::embeddings::{EmbeddingAggregator, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use crate::extractor::extract_document;
use crate::models::{DocumentFormat, ExtractedDocument, RfpDocument};
use crate::schema::FlattenedFields;
use crate::search::SimilarRfpSearch;
use crate::traits::{RfpIndex, TextGenerator};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// The three hosted collaborators, wired once and shared by every operation.
pub struct RfpServices<G, E, S> {
    pub analyzer: RfpAnalyzer<G>,
    pub embedder: EmbeddingAggregator<E>,
    pub index: S,
}

impl<G, E, S> RfpServices<G, E, S>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    pub fn new(generator: G, embedding_provider: E, index: S) -> Self {
        Self::from_parts(
            RfpAnalyzer::new(generator),
            EmbeddingAggregator::new(embedding_provider),
            index,
        )
    }

    pub fn from_parts(
        analyzer: RfpAnalyzer<G>,
        embedder: EmbeddingAggregator<E>,
        index: S,
    ) -> Self {
        Self {
            analyzer,
            embedder,
            index,
        }
    }

    pub fn similar(&self) -> SimilarRfpSearch<'_, E, S> {
        SimilarRfpSearch::new(&self.embedder, &self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOutcome {
    Stored { id: String },
    /// The store answered but did not accept the document.
    Rejected { id: String },
    /// Embedding, serialization or the upload request failed.
    Failed(String),
    Skipped,
}

impl StorageOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedRfp {
    pub source: PathBuf,
    pub document: ExtractedDocument,
    pub analysis: StructuredAnalysis,
    pub fields: FlattenedFields,
    pub storage: StorageOutcome,
}

/// Extracts, analyzes and (optionally) stores one file.
///
/// Extraction and analysis errors are returned. Anything that goes wrong
/// after analysis is reported through [`StorageOutcome`] so the analysis is
/// never lost.
pub async fn analyze_and_store<G, E, S>(
    services: &RfpServices<G, E, S>,
    path: &Path,
    store: bool,
) -> Result<AnalyzedRfp>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    let document = extract_document(path)?;
    analyze_extracted(services, path.to_path_buf(), document, store).await
}

pub async fn analyze_extracted<G, E, S>(
    services: &RfpServices<G, E, S>,
    source: PathBuf,
    document: ExtractedDocument,
    store: bool,
) -> Result<AnalyzedRfp>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    let analysis = services.analyzer.analyze(&document.text).await?;
    let fields = analysis.flatten(Some(&document.title));

    let storage = if store {
        store_analysis(services, &document.text, &fields, Utc::now()).await
    } else {
        StorageOutcome::Skipped
    };

    info!(
        source = %source.display(),
        title = %fields.title,
        requirements = fields.requirements.len(),
        storage = ?storage,
        "rfp analyzed"
    );

    Ok(AnalyzedRfp {
        source,
        document,
        analysis,
        fields,
        storage,
    })
}

async fn store_analysis<G, E, S>(
    services: &RfpServices<G, E, S>,
    content: &str,
    fields: &FlattenedFields,
    created_at: DateTime<Utc>,
) -> StorageOutcome
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    match upload_analysis(services, content, fields, created_at).await {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(error = %error, "analysis kept in memory, storing failed");
            StorageOutcome::Failed(error.to_string())
        }
    }
}

async fn upload_analysis<G, E, S>(
    services: &RfpServices<G, E, S>,
    content: &str,
    fields: &FlattenedFields,
    created_at: DateTime<Utc>,
) -> Result<StorageOutcome>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    let vector = services.embedder.embed(content).await?;
    let document = RfpDocument::new(fields.clone(), content.to_string(), vector, created_at);
    let id = document.id.clone();

    if services.index.upload_document(&document).await? {
        Ok(StorageOutcome::Stored { id })
    } else {
        Ok(StorageOutcome::Rejected { id })
    }
}

/// Every supported file under `folder`, recursively, in path order.
pub fn discover_rfp_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(DocumentFormat::from_extension)
                .is_some()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort_unstable();
    files
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub analyzed: Vec<AnalyzedRfp>,
    pub skipped_files: Vec<SkippedFile>,
}

impl IngestionReport {
    pub fn stored_count(&self) -> usize {
        self.analyzed
            .iter()
            .filter(|item| item.storage.is_stored())
            .count()
    }
}

/// Runs [`analyze_and_store`] over every discovered file, one at a time.
/// A file that cannot be analyzed is recorded and skipped.
pub async fn ingest_folder_best_effort<G, E, S>(
    services: &RfpServices<G, E, S>,
    folder: &Path,
) -> Result<IngestionReport>
where
    G: TextGenerator,
    E: EmbeddingProvider,
    S: RfpIndex,
{
    let files = discover_rfp_files(folder);

    if files.is_empty() {
        return Err(PipelineError::InvalidArgument(format!(
            "no rfp files found in {}",
            folder.display()
        )));
    }

    let mut report = IngestionReport::default();

    for path in files {
        match analyze_and_store(services, &path, true).await {
            Ok(analyzed) => report.analyzed.push(analyzed),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping file");
                report.skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(report)
}
