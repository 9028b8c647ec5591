//! Groq chat-completions client (OpenAI-compatible wire format).

use crate::config::{Config, API_KEY_VAR};
use crate::http::{build_client, transport_error, with_retries};
use async_trait::async_trait;
use domain::ports::CompletionProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::errors::ServiceError;
use shared::telemetry::Telemetry;
use std::time::Duration;

/// Greedy decoding so identical questions get stable answers.
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct GroqClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl GroqClient {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            base_url: config.groq_base_url.trim_end_matches('/').to_string(),
            model: config.groq_model.clone(),
            api_key: config.groq_api_key.clone(),
            timeout: config.request_timeout,
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ServiceError::MissingCredential {
                env_var: API_KEY_VAR.to_string(),
            })
    }

    async fn request_completion(&self, api_key: &str, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
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
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&body)
    }
}

/// Pull the first choice's text out of a chat-completions body.
fn parse_completion(body: &str) -> Result<String, ServiceError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("completion response: {e}")))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::MalformedResponse("completion has no message content".into()))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl CompletionProvider for GroqClient {
    fn check_ready(&self) -> Result<(), ServiceError> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let timer = Telemetry::new();
        let text = with_retries("groq", self.max_retries, || {
            self.request_completion(api_key, prompt)
        })
        .await?;
        tracing::debug!(model = %self.model, elapsed_ms = timer.elapsed_ms(), "completion received");
        Ok(text)
    }
}
