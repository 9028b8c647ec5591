use dotenvy::dotenv;
use shared::errors::BotError;
use shared::types::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const MAX_RETRIES_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub groq_model: String,
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub db_path: String,
    pub data_dir: String,
    pub top_k: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Config {
    /// Read `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = Self {
            groq_api_key: lookup(API_KEY_VAR)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            groq_base_url: text("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
            groq_model: text("GROQ_MODEL", "meta-llama/llama-4-maverick-17b-128e-instruct"),
            ollama_base_url: text("OLLAMA_BASE_URL", "http://localhost:11434"),
            embedding_model: text("EMBEDDING_MODEL", "all-minilm"),
            embedding_dimension: parse_number(&lookup, "EMBEDDING_DIMENSION", 384)?,
            db_path: text("DB_PATH", "vectorstore/medibot.db"),
            data_dir: text("DATA_DIR", "data"),
            top_k: parse_number(&lookup, "RETRIEVAL_TOP_K", 3)?,
            request_timeout: Duration::from_secs(parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 60)?),
            max_retries: parse_number(&lookup, "LLM_MAX_RETRIES", 2)?,
        };

        if config.top_k == 0 {
            return Err(BotError::Configuration("RETRIEVAL_TOP_K must be at least 1".into()));
        }
        if config.embedding_dimension == 0 {
            return Err(BotError::Configuration(
                "EMBEDDING_DIMENSION must be at least 1".into(),
            ));
        }
        if config.request_timeout.is_zero() {
            return Err(BotError::Configuration(
                "REQUEST_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if config.max_retries > MAX_RETRIES_LIMIT {
            return Err(BotError::Configuration(format!(
                "LLM_MAX_RETRIES must be at most {MAX_RETRIES_LIMIT}, got {}",
                config.max_retries
            )));
        }
        Ok(config)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.groq_api_key.as_deref().ok_or_else(|| {
            BotError::Configuration(format!(
                "API key not found. Set {} environment variable",
                API_KEY_VAR
            ))
        })
    }
}

fn parse_number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| BotError::Configuration(format!("{key} must be a number, got '{v}'"))),
    }
}
