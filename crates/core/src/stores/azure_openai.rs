use super::{endpoint_url, failure_details};
use crate::embeddings::{EmbeddingProvider, DEFAULT_EMBEDDING_DIMENSIONS};
use crate::error::{EmbeddingError, GenerationError};
use crate::models::CompletionRequest;
use crate::traits::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const BACKEND: &str = "azure-openai";

pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_CHAT_DEPLOYMENT: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub embedding_dimensions: usize,
}

impl AzureOpenAiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
            chat_deployment: DEFAULT_CHAT_DEPLOYMENT.to_string(),
            embedding_deployment: DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    fn deployment_url(
        &self,
        deployment: &str,
        operation: &str,
    ) -> Result<url::Url, url::ParseError> {
        endpoint_url(
            &self.endpoint,
            &format!("openai/deployments/{deployment}/{operation}"),
            &self.api_version,
        )
    }
}

/// Chat completion and embedding client for one Azure OpenAI resource.
pub struct AzureOpenAiClient {
    client: Arc<Client>,
    config: AzureOpenAiConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let url = self
            .config
            .deployment_url(&self.config.chat_deployment, "chat/completions")?;
        debug!(deployment = %self.config.chat_deployment, "requesting chat completion");

        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(&chat_request_body(&self.config.chat_deployment, request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::BackendResponse {
                backend: BACKEND.to_string(),
                details: failure_details(response).await,
            });
        }

        let body: Value = response.json().await?;
        parse_chat_response(&body)
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiClient {
    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = self
            .config
            .deployment_url(&self.config.embedding_deployment, "embeddings")?;

        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(&json!({
                "model": self.config.embedding_deployment,
                "input": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::BackendResponse {
                backend: BACKEND.to_string(),
                details: failure_details(response).await,
            });
        }

        let body: Value = response.json().await?;
        parse_embedding_response(&body)
    }
}

fn chat_request_body(deployment: &str, request: &CompletionRequest) -> Value {
    json!({
        "model": deployment,
        "messages": [
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.user},
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    })
}

fn parse_chat_response(body: &Value) -> Result<String, GenerationError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
        .ok_or(GenerationError::EmptyResponse)
}

fn parse_embedding_response(body: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let values = body
        .pointer("/data/0/embedding")
        .and_then(Value::as_array)
        .filter(|values| !values.is_empty())
        .ok_or(EmbeddingError::EmptyResponse)?;

    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .ok_or_else(|| EmbeddingError::BackendResponse {
                    backend: BACKEND.to_string(),
                    details: format!("non-numeric embedding component: {value}"),
                })
        })
        .collect()
}
