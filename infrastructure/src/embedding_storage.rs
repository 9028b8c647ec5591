use crate::search::SearchEngine;
use domain::models::{ChunkMetadata, DocumentChunk, Embedding, ScoredChunk};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Result as SqlResult};
use shared::errors::BotError;
use shared::types::Result;
use std::fs;
use std::path::{Path, PathBuf};

const META_MODEL: &str = "embedding_model";
const META_DIMENSION: &str = "dimension";
const META_CHUNK_COUNT: &str = "chunk_count";

/// Facts recorded alongside the vectors so a query-time model mismatch is
/// caught at load instead of producing meaningless neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
}

/// Writes a complete index file. Only used by ingestion.
pub struct EmbeddingStorage {
    conn: Connection,
}

impl EmbeddingStorage {
    /// Write `embeddings` as a fresh index at `path`. The file is built next
    /// to the target and renamed over it, so readers never see half an index.
    pub fn write_index(path: impl AsRef<Path>, model: &str, embeddings: &[Embedding]) -> Result<IndexManifest> {
        let path = path.as_ref();
        let dimension = match embeddings.first() {
            Some(first) => first.vector.len(),
            None => return Err(BotError::Ingestion("no chunks to index".into())),
        };
        if let Some(bad) = embeddings.iter().find(|e| e.vector.len() != dimension) {
            return Err(BotError::Ingestion(format!(
                "inconsistent embedding dimension: expected {}, got {}",
                dimension,
                bad.vector.len()
            )));
        }

        let manifest = IndexManifest {
            embedding_model: model.to_string(),
            dimension,
            chunk_count: embeddings.len(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ingestion_error)?;
        }
        let tmp_path = temp_path(path);
        if tmp_path.exists() {
            fs::remove_file(&tmp_path).map_err(ingestion_error)?;
        }

        {
            let storage = Self::create(&tmp_path)?;
            storage.insert_embeddings(embeddings)?;
            storage.write_manifest(&manifest)?;
        }
        fs::rename(&tmp_path, path).map_err(ingestion_error)?;
        Ok(manifest)
    }

    fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(ingestion_error)?;
        Self::setup_db(&conn).map_err(ingestion_error)?;
        Ok(Self { conn })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vector BLOB NOT NULL,
                text TEXT NOT NULL,
                source TEXT,
                page_label TEXT
            );
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
        )
    }

    fn insert_embeddings(&self, embeddings: &[Embedding]) -> Result<()> {
        let tx = self.conn.unchecked_transaction().map_err(ingestion_error)?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO chunks (vector, text, source, page_label) VALUES (?, ?, ?, ?)")
                .map_err(ingestion_error)?;
            for embedding in embeddings {
                let vector_bytes = serde_json::to_vec(&embedding.vector).map_err(ingestion_error)?;
                stmt.execute(params![
                    vector_bytes,
                    embedding.chunk.text,
                    embedding.chunk.metadata.source,
                    embedding.chunk.metadata.page_label
                ])
                .map_err(ingestion_error)?;
            }
        }
        tx.commit().map_err(ingestion_error)?;
        Ok(())
    }

    fn write_manifest(&self, manifest: &IndexManifest) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)")
            .map_err(ingestion_error)?;
        for (key, value) in [
            (META_MODEL, manifest.embedding_model.clone()),
            (META_DIMENSION, manifest.dimension.to_string()),
            (META_CHUNK_COUNT, manifest.chunk_count.to_string()),
        ] {
            stmt.execute(params![key, value]).map_err(ingestion_error)?;
        }
        Ok(())
    }
}

type ChunkRow = (i64, Vec<u8>, String, Option<String>, Option<String>);

fn read_row(row: &rusqlite::Row<'_>) -> SqlResult<ChunkRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ingestion_error(err: impl std::fmt::Display) -> BotError {
    BotError::Ingestion(err.to_string())
}

/// Read-only, in-memory view of an index file.
#[derive(Debug)]
pub struct VectorIndex {
    path: PathBuf,
    manifest: IndexManifest,
    entries: Vec<Embedding>,
}

impl VectorIndex {
    /// Open the index at `path` and check it was built with `expected_model`
    /// producing `expected_dimension`-wide vectors.
    pub fn load(path: impl AsRef<Path>, expected_model: &str, expected_dimension: usize) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let fail = |reason: String| BotError::index_load(display.clone(), reason);

        if !path.is_file() {
            return Err(fail("no index file found; run `medibot --ingest` first".into()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| fail(e.to_string()))?;

        let manifest = Self::read_manifest(&conn).map_err(|e| fail(e.to_string()))?;
        let manifest = match manifest {
            Some(manifest) => manifest,
            None => return Err(fail("index has no manifest".into())),
        };

        if manifest.embedding_model != expected_model {
            return Err(fail(format!(
                "index was built with embedding model '{}', but '{}' is configured",
                manifest.embedding_model, expected_model
            )));
        }
        if manifest.dimension != expected_dimension {
            return Err(fail(format!(
                "index stores {}-dimensional vectors, but the embedding model produces {}",
                manifest.dimension, expected_dimension
            )));
        }

        let entries = Self::read_entries(&conn, manifest.dimension).map_err(fail)?;
        if entries.is_empty() {
            return Err(fail("index contains no chunks".into()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            entries,
        })
    }

    fn read_manifest(conn: &Connection) -> SqlResult<Option<IndexManifest>> {
        let get = |key: &str| -> SqlResult<Option<String>> {
            conn.query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| row.get(0))
                .optional()
        };
        let (Some(model), Some(dimension)) = (get(META_MODEL)?, get(META_DIMENSION)?) else {
            return Ok(None);
        };
        let Ok(dimension) = dimension.parse::<usize>() else {
            return Ok(None);
        };
        let chunk_count = get(META_CHUNK_COUNT)?
            .and_then(|c| c.parse().ok())
            .unwrap_or_default();
        Ok(Some(IndexManifest {
            embedding_model: model,
            dimension,
            chunk_count,
        }))
    }

    fn read_entries(conn: &Connection, dimension: usize) -> std::result::Result<Vec<Embedding>, String> {
        let mut stmt = conn
            .prepare("SELECT id, vector, text, source, page_label FROM chunks ORDER BY id")
            .map_err(|e| e.to_string())?;
        let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
        let mut embeddings = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let (id, vector_bytes, text, source, page_label) = read_row(row).map_err(|e| e.to_string())?;
            let vector: Vec<f32> = serde_json::from_slice(&vector_bytes)
                .map_err(|e| format!("chunk {id} has an unreadable vector: {e}"))?;
            if vector.len() != dimension {
                return Err(format!(
                    "chunk {id} has {} dimensions, manifest says {dimension}",
                    vector.len()
                ));
            }
            embeddings.push(Embedding {
                vector,
                chunk: DocumentChunk {
                    text,
                    metadata: ChunkMetadata { source, page_label },
                },
            });
        }
        Ok(embeddings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        SearchEngine::find_relevant_chunks(query, &self.entries, top_k)
    }
}
