use super::{endpoint_url, failure_details};
use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::error::StoreError;
use crate::models::{RfpDocument, SearchMatch};
use crate::traits::RfpIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

const BACKEND: &str = "azure-search";

pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const DEFAULT_INDEX_NAME: &str = "rfp-index";
pub const VECTOR_FIELD: &str = "content_vector";
pub const SEMANTIC_CONFIGURATION: &str = "my-semantic-config";
const SELECT_FIELDS: &str = "title,project_type,requirements,evaluation_criteria,created_date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
    pub vector_dimensions: usize,
}

impl AzureSearchConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
            vector_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    fn index_url(&self, suffix: &str) -> Result<url::Url, url::ParseError> {
        endpoint_url(
            &self.endpoint,
            &format!("indexes/{}{suffix}", self.index_name),
            &self.api_version,
        )
    }
}

/// Hybrid keyword + vector index of analyzed RFPs.
pub struct AzureSearchStore {
    client: Arc<Client>,
    config: AzureSearchConfig,
}

impl AzureSearchStore {
    pub fn new(config: AzureSearchConfig) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &AzureSearchConfig {
        &self.config
    }

    fn check_dimensions(&self, actual: usize) -> Result<(), StoreError> {
        let expected = self.config.vector_dimensions;
        if actual != expected {
            return Err(StoreError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}

#[async_trait]
impl RfpIndex for AzureSearchStore {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.config.index_url("")?)
            .header("api-key", &self.config.api_key)
            .json(&index_definition(&self.config))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: failure_details(response).await,
            });
        }

        info!(index = %self.config.index_name, "search index ready");
        Ok(())
    }

    async fn upload_document(&self, document: &RfpDocument) -> Result<bool, StoreError> {
        self.check_dimensions(document.content_vector.len())?;

        let response = self
            .client
            .post(self.config.index_url("/docs/index")?)
            .header("api-key", &self.config.api_key)
            .json(&upload_body(document)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: failure_details(response).await,
            });
        }

        let body: Value = response.json().await?;
        let accepted = all_statuses_succeeded(&body);
        if !accepted {
            warn!(id = %document.id, "search index rejected document");
        }

        Ok(accepted)
    }

    async fn hybrid_search(
        &self,
        text: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        self.check_dimensions(vector.len())?;

        let response = self
            .client
            .post(self.config.index_url("/docs/search")?)
            .header("api-key", &self.config.api_key)
            .json(&search_body(text, vector, top_k))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: failure_details(response).await,
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_search_response(&body))
    }
}

fn index_definition(config: &AzureSearchConfig) -> Value {
    json!({
        "name": config.index_name,
        "fields": [
            {"name": "id", "type": "Edm.String", "key": true, "filterable": true},
            {"name": "title", "type": "Edm.String", "searchable": true},
            {"name": "content", "type": "Edm.String", "searchable": true},
            {"name": "requirements", "type": "Edm.String", "searchable": true},
            {"name": "project_type", "type": "Edm.String", "searchable": true, "filterable": true},
            {"name": "budget_range", "type": "Edm.String", "searchable": true},
            {"name": "submission_deadline", "type": "Edm.String", "filterable": true},
            {"name": "evaluation_criteria", "type": "Edm.String", "searchable": true},
            {"name": "created_date", "type": "Edm.DateTimeOffset", "filterable": true, "sortable": true},
            {
                "name": VECTOR_FIELD,
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "dimensions": config.vector_dimensions,
                "vectorSearchProfile": "myHnswProfile"
            }
        ],
        "vectorSearch": {
            "algorithms": [{"name": "myHnsw", "kind": "hnsw"}],
            "profiles": [{"name": "myHnswProfile", "algorithm": "myHnsw"}]
        },
        "semantic": {
            "configurations": [{
                "name": SEMANTIC_CONFIGURATION,
                "prioritizedFields": {
                    "titleField": {"fieldName": "title"},
                    "prioritizedContentFields": [{"fieldName": "content"}]
                }
            }]
        }
    })
}

fn upload_body(document: &RfpDocument) -> Result<Value, StoreError> {
    let mut record = serde_json::to_value(document)?;
    if let Some(fields) = record.as_object_mut() {
        fields.insert("@search.action".to_string(), Value::from("upload"));
    }
    Ok(json!({ "value": [record] }))
}

fn search_body(text: &str, vector: &[f32], top_k: usize) -> Value {
    json!({
        "search": text,
        "vectorQueries": [{
            "kind": "vector",
            "vector": vector,
            "k": top_k,
            "fields": VECTOR_FIELD
        }],
        "select": SELECT_FIELDS,
        "top": top_k
    })
}

/// `true` only when the response lists at least one result and every
/// result reports success.
fn all_statuses_succeeded(body: &Value) -> bool {
    body.get("value")
        .and_then(Value::as_array)
        .filter(|results| !results.is_empty())
        .is_some_and(|results| {
            results
                .iter()
                .all(|result| result.get("status").and_then(Value::as_bool) == Some(true))
        })
}

fn parse_search_response(body: &Value) -> Vec<SearchMatch> {
    let hits = body
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| {
            let text = |field: &str| {
                hit.get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };

            SearchMatch {
                title: text("title"),
                project_type: text("project_type"),
                requirements: text("requirements"),
                evaluation_criteria: text("evaluation_criteria"),
                created_date: text("created_date"),
                score: hit
                    .get("@search.score")
                    .and_then(Value::as_f64)
                    .unwrap_or_default(),
            }
        })
        .collect()
}
