use async_trait::async_trait;
use shared::errors::ServiceError;

/// Turns text into a fixed-dimension vector. Must be the same model the
/// index was built with.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    fn model_name(&self) -> &str;
}

/// Generates text for a fully built prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Fails when the provider cannot be used at all (e.g. no credential).
    /// Checked before any network traffic.
    fn check_ready(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}
