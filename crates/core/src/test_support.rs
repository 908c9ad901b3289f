use crate::embeddings::EmbeddingProvider;
use crate::error::{EmbeddingError, GenerationError, StoreError};
use crate::models::{CompletionRequest, RfpDocument, SearchMatch};
use crate::traits::{RfpIndex, TextGenerator};
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Replies with the same text to every request and records prompts.
pub struct CannedGenerator {
    pub reply: String,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl CannedGenerator {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.requests.lock().expect("lock").push(request.clone());
        Ok(self.reply.clone())
    }
}

pub struct FixedEmbedder {
    pub dimensions: usize,
    pub inputs: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FixedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            inputs: Mutex::new(Vec::new()),
            fail: false,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inputs.lock().expect("lock").push(text.to_string());
        if self.fail {
            return Err(EmbeddingError::BackendResponse {
                backend: "fake".to_string(),
                details: "429 Too Many Requests".to_string(),
            });
        }
        Ok(vec![0.5; self.dimensions])
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    pub documents: Mutex<Vec<RfpDocument>>,
    pub queries: Mutex<Vec<(String, usize, usize)>>,
    pub results: Vec<SearchMatch>,
    pub reject_uploads: bool,
    pub fail_uploads: bool,
}

#[async_trait]
impl RfpIndex for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upload_document(&self, document: &RfpDocument) -> Result<bool, StoreError> {
        if self.fail_uploads {
            return Err(StoreError::BackendResponse {
                backend: "memory".to_string(),
                details: "503 Service Unavailable".to_string(),
            });
        }
        if self.reject_uploads {
            return Ok(false);
        }
        self.documents.lock().expect("lock").push(document.clone());
        Ok(true)
    }

    async fn hybrid_search(
        &self,
        text: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        self.queries
            .lock()
            .expect("lock")
            .push((text.to_string(), vector.len(), top_k));
        Ok(self.results.iter().take(top_k).cloned().collect())
    }
}

pub fn search_match(title: &str, score: f64) -> SearchMatch {
    SearchMatch {
        title: title.to_string(),
        project_type: String::new(),
        requirements: "[]".to_string(),
        evaluation_criteria: "{}".to_string(),
        created_date: "2026-10-01T00:00:00.000000Z".to_string(),
        score,
    }
}

/// Writes a PDF with one "Hello RFP page N" line per page.
pub fn write_pdf(path: &Path, title: Option<&str>, page_count: usize) {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in 0..page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Hello RFP page {}", page + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = document.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        document.trailer.set("Info", info_id);
    }

    document.save(path).expect("save pdf");
}

pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    let mut docx = docx_rs::Docx::new();
    for paragraph in paragraphs {
        docx = docx.add_paragraph(
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*paragraph)),
        );
    }
    let file = fs::File::create(path).expect("create docx");
    docx.build().pack(file).expect("pack docx");
}
