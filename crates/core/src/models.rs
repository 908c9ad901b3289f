use crate::schema::FlattenedFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{json::JsonString, serde_as};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    pub const SUPPORTED_EXTENSIONS: [&'static str; 3] = ["pdf", "docx", "txt"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionWarning {
    PageLimitReached {
        total_pages: usize,
        processed_pages: usize,
    },
    PageFailed {
        page: u32,
        reason: String,
    },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageLimitReached {
                total_pages,
                processed_pages,
            } => write!(
                f,
                "document has {total_pages} pages, only the first {processed_pages} were processed"
            ),
            Self::PageFailed { page, reason } => {
                write!(f, "page {page} could not be extracted: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub title: String,
    pub format: DocumentFormat,
    pub warnings: Vec<ExtractionWarning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationCriteria {
    #[serde(rename = "정량정성배점", default)]
    pub scoring: String,
    #[serde(rename = "가점감점요건", default)]
    pub bonus_and_penalty: String,
    #[serde(rename = "탈락필수요건", default)]
    pub disqualification: String,
}

/// One record of the search index. `requirements` and `evaluation_criteria`
/// travel as JSON-encoded strings so the index can keyword-search them.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RfpDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde_as(as = "JsonString")]
    pub requirements: Vec<String>,
    pub project_type: String,
    pub budget_range: String,
    pub submission_deadline: String,
    #[serde_as(as = "JsonString")]
    pub evaluation_criteria: EvaluationCriteria,
    pub created_date: String,
    pub content_vector: Vec<f32>,
}

impl RfpDocument {
    pub fn new(
        fields: FlattenedFields,
        content: String,
        content_vector: Vec<f32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: document_id(created_at),
            title: fields.title,
            content,
            requirements: fields.requirements,
            project_type: fields.project_type,
            budget_range: fields.budget_range,
            submission_deadline: fields.submission_deadline,
            evaluation_criteria: fields.evaluation_criteria,
            created_date: created_at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            content_vector,
        }
    }
}

/// Second-granularity id; two writes within the same second share an id.
pub fn document_id(created_at: DateTime<Utc>) -> String {
    format!("rfp_{}", created_at.format("%Y%m%d_%H%M%S"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub title: String,
    pub project_type: String,
    pub requirements: String,
    pub evaluation_criteria: String,
    pub created_date: String,
    pub score: f64,
}

impl SearchMatch {
    /// Decodes the stored requirements array, falling back to the raw string.
    pub fn requirement_list(&self) -> Vec<String> {
        serde_json::from_str::<Vec<String>>(&self.requirements).unwrap_or_else(|_| {
            if self.requirements.trim().is_empty() {
                Vec::new()
            } else {
                vec![self.requirements.clone()]
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}
