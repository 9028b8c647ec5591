use crate::config::Config;
use crate::http::{build_client, transport_error, with_retries};
use async_trait::async_trait;
use domain::ports::EmbeddingProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::errors::ServiceError;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings from an Ollama server (`/api/embeddings`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        Ok(Self {
            client: Arc::new(build_client(config.request_timeout)?),
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            timeout: config.request_timeout,
            max_retries: config.max_retries,
        })
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        with_retries("ollama", self.max_retries, || self.request_embedding(text)).await
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::MalformedResponse(format!("embedding response: {e}")))?;
        if parsed.embedding.is_empty() {
            return Err(ServiceError::MalformedResponse(format!(
                "model '{}' returned an empty embedding",
                self.model
            )));
        }
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.generate_embedding(text).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
