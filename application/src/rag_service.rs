use crate::index_loader::IndexLoader;
use domain::models::Answer;
use domain::ports::{CompletionProvider, EmbeddingProvider};
use domain::prompt::PromptTemplate;
use shared::errors::{BotError, ServiceError};
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;

/// Retrieved passages are joined with a blank line so chunk boundaries
/// survive in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Answers one question at a time: embed, retrieve, prompt, complete.
pub struct RagService {
    index: Arc<IndexLoader>,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
    top_k: usize,
}

impl RagService {
    pub fn new(
        index: Arc<IndexLoader>,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            index,
            embedder,
            completion,
            template,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fail fast on anything that would stop every query from working.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.completion.check_ready().map_err(BotError::from)?;
        self.index.get().await.map(|_| ())
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        // Checked first so a missing credential never causes network traffic.
        self.completion.check_ready().map_err(BotError::from)?;

        let question = question.trim();
        if question.is_empty() {
            return Err(BotError::QueryExecution("question is empty".into()));
        }

        let index = self.index.get().await?;
        let timer = Telemetry::new();

        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| stage_error("embedding", e))?;
        if query_embedding.len() != index.dimension() {
            return Err(BotError::QueryExecution(format!(
                "embedding model '{}' returned {} dimensions, index expects {}",
                self.embedder.model_name(),
                query_embedding.len(),
                index.dimension()
            )));
        }

        let hits = index.search(&query_embedding, self.top_k);
        tracing::debug!(hits = hits.len(), elapsed_ms = timer.elapsed_ms(), "retrieved context");

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let prompt = self.template.build(&context, question);

        let text = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| stage_error("completion", e))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BotError::QueryExecution(
                "completion service returned an empty answer".into(),
            ));
        }

        tracing::info!(
            citations = hits.len(),
            elapsed_ms = timer.elapsed_ms(),
            "answered question"
        );
        Ok(Answer::new(text.to_string(), hits))
    }
}

fn stage_error(stage: &str, err: ServiceError) -> BotError {
    match err {
        ServiceError::MissingCredential { .. } => BotError::from(err),
        other => BotError::QueryExecution(format!("{stage} failed: {other}")),
    }
}
