use domain::models::{DocumentChunk, Embedding};
use domain::ports::EmbeddingProvider;
use futures::stream::{self, StreamExt, TryStreamExt};
use shared::errors::ServiceError;
use std::sync::Arc;

const BATCH_SIZE: usize = 32;
const MAX_IN_FLIGHT: usize = 8;

/// Embeds chunks for ingestion.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Output order matches input order.
    pub async fn generate_embeddings(&self, chunks: &[DocumentChunk]) -> Result<Vec<Embedding>, ServiceError> {
        let mut embeddings = Vec::with_capacity(chunks.len());

        for (i, batch) in chunks.chunks(BATCH_SIZE).enumerate() {
            tracing::info!(
                batch = i + 1,
                done = embeddings.len(),
                total = chunks.len(),
                "embedding chunks"
            );
            let batch_embeddings = self.generate_batch_embeddings(batch).await?;
            embeddings.extend(batch_embeddings);
        }
        Ok(embeddings)
    }

    async fn generate_batch_embeddings(&self, chunks: &[DocumentChunk]) -> Result<Vec<Embedding>, ServiceError> {
        stream::iter(chunks)
            .map(|chunk| async move {
                let vector = self.provider.embed(&chunk.text).await?;
                Ok::<_, ServiceError>(Embedding {
                    vector,
                    chunk: chunk.clone(),
                })
            })
            .buffered(MAX_IN_FLIGHT)
            .try_collect()
            .await
    }
}
