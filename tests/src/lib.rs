//! Fakes and fixtures shared by the integration tests.

use application::index_loader::{EmbeddingSpec, IndexLoader};
use async_trait::async_trait;
use domain::models::{DocumentChunk, Embedding};
use domain::ports::{CompletionProvider, EmbeddingProvider};
use infrastructure::embedding_storage::EmbeddingStorage;
use shared::errors::ServiceError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const MODEL: &str = "all-minilm";
pub const DIMENSION: usize = 384;

/// Bag-of-words embedder: every distinct word gets its own axis.
#[derive(Default)]
pub struct KeywordEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            let next = vocabulary.len() % DIMENSION;
            let axis = *vocabulary.entry(word).or_insert(next);
            vector[axis] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    fn model_name(&self) -> &str {
        MODEL
    }
}

/// Replies with a fixed answer or a fixed error and keeps every prompt.
pub struct ScriptedCompletion {
    reply: Result<String, ServiceError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn answering(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ServiceError) -> Self {
        Self {
            reply: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

/// A small pharmacology corpus with page labels.
pub fn medical_chunks() -> Vec<DocumentChunk> {
    vec![
        DocumentChunk::new("Aspirin reduces fever and mild pain.", Some("pharma.pdf"), Some("3")),
        DocumentChunk::new("Insulin lowers blood sugar in diabetes.", Some("pharma.pdf"), Some("8")),
        DocumentChunk::new("Vaccines train the immune system.", Some("immunology.pdf"), Some("1")),
        DocumentChunk::new("Hydration matters during recovery.", Some("notes.md"), None),
        DocumentChunk::new("Antibiotics do not treat viral infections.", Some("pharma.pdf"), Some("14")),
    ]
}

/// Embeds `chunks` with `embedder` and writes them as an index at `dir/medibot.db`.
pub async fn write_fixture_index(dir: &Path, embedder: &KeywordEmbedder, chunks: Vec<DocumentChunk>) -> PathBuf {
    let mut embeddings = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = embedder.vectorize(&chunk.text);
        embeddings.push(Embedding { vector, chunk });
    }
    let path = dir.join("medibot.db");
    EmbeddingStorage::write_index(&path, MODEL, &embeddings).unwrap();
    path
}

pub fn loader_for(path: impl Into<PathBuf>) -> IndexLoader {
    IndexLoader::new(
        path,
        EmbeddingSpec {
            model: MODEL.into(),
            dimension: DIMENSION,
        },
    )
}
