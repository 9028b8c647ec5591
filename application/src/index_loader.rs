use infrastructure::embedding_storage::VectorIndex;
use shared::errors::BotError;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// The embedding model an index must have been built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSpec {
    pub model: String,
    pub dimension: usize,
}

/// Loads the vector index once and hands out the same shared handle after.
pub struct IndexLoader {
    path: PathBuf,
    spec: EmbeddingSpec,
    index: OnceCell<Arc<VectorIndex>>,
}

impl IndexLoader {
    pub fn new(path: impl Into<PathBuf>, spec: EmbeddingSpec) -> Self {
        Self {
            path: path.into(),
            spec,
            index: OnceCell::new(),
        }
    }

    pub fn spec(&self) -> &EmbeddingSpec {
        &self.spec
    }

    pub fn is_loaded(&self) -> bool {
        self.index.initialized()
    }

    /// A failed load is not cached; the next call tries again.
    pub async fn get(&self) -> Result<Arc<VectorIndex>> {
        self.index
            .get_or_try_init(|| async {
                let timer = Telemetry::new();
                let path = self.path.clone();
                let spec = self.spec.clone();
                let index = tokio::task::spawn_blocking(move || {
                    VectorIndex::load(&path, &spec.model, spec.dimension)
                })
                .await
                .map_err(|e| BotError::index_load(self.path.display().to_string(), e.to_string()))??;
                tracing::info!(
                    path = %self.path.display(),
                    chunks = index.len(),
                    dimension = index.dimension(),
                    elapsed_ms = timer.elapsed_ms(),
                    "vector index loaded"
                );
                Ok::<_, BotError>(Arc::new(index))
            })
            .await
            .cloned()
    }
}
