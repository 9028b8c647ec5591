use domain::models::DocumentChunk;
use domain::ports::EmbeddingProvider;
use infrastructure::embedder::Embedder;
use infrastructure::embedding_storage::{EmbeddingStorage, IndexManifest};
use infrastructure::file_scanner::FileScanner;
use shared::errors::BotError;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub pages: usize,
    pub manifest: IndexManifest,
}

/// Builds the index file the chat session reads.
pub struct IngestService {
    db_path: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    expected_dimension: usize,
}

impl IngestService {
    pub fn new(db_path: impl Into<PathBuf>, provider: Arc<dyn EmbeddingProvider>, expected_dimension: usize) -> Self {
        Self {
            db_path: db_path.into(),
            provider,
            expected_dimension,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn index_exists(&self) -> bool {
        self.db_path.is_file()
    }

    pub async fn ingest(&self, data_dir: impl AsRef<Path>) -> Result<IngestReport> {
        let timer = Telemetry::new();
        let data_dir = data_dir.as_ref().to_path_buf();

        let scans = tokio::task::spawn_blocking(move || FileScanner::new(data_dir).scan_files())
            .await
            .map_err(|e| BotError::Ingestion(e.to_string()))??;

        let documents = scans.iter().filter(|s| !s.chunks.is_empty()).count();
        let pages = scans.iter().map(|s| s.page_count).sum();
        let chunks: Vec<DocumentChunk> = scans.into_iter().flat_map(|s| s.chunks).collect();
        if chunks.is_empty() {
            return Err(BotError::Ingestion("no text found in any document".into()));
        }
        tracing::info!(documents, pages, chunks = chunks.len(), "documents chunked");

        let embeddings = Embedder::new(self.provider.clone())
            .generate_embeddings(&chunks)
            .await
            .map_err(|e| BotError::Ingestion(format!("embedding failed: {e}")))?;

        if let Some(bad) = embeddings.iter().find(|e| e.vector.len() != self.expected_dimension) {
            return Err(BotError::Ingestion(format!(
                "embedding model '{}' returned {} dimensions, expected {}",
                self.provider.model_name(),
                bad.vector.len(),
                self.expected_dimension
            )));
        }

        let db_path = self.db_path.clone();
        let model = self.provider.model_name().to_string();
        let manifest = tokio::task::spawn_blocking(move || {
            EmbeddingStorage::write_index(&db_path, &model, &embeddings)
        })
        .await
        .map_err(|e| BotError::Ingestion(e.to_string()))??;

        tracing::info!(
            chunks = manifest.chunk_count,
            elapsed_ms = timer.elapsed_ms(),
            "index written"
        );
        Ok(IngestReport {
            documents,
            pages,
            manifest,
        })
    }
}
