use serde::{Deserialize, Serialize};

const UNKNOWN_SOURCE: &str = "Unknown source";
const UNKNOWN_PAGE: &str = "N/A";

/// Where a chunk came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: Option<String>,
    pub page_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source: Option<&str>, page_label: Option<&str>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                source: source.map(str::to_string),
                page_label: page_label.map(str::to_string),
            },
        }
    }
}

/// A retrieved chunk together with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// A stored chunk with its embedding, as written by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: Option<String>,
    pub page_label: Option<String>,
}

impl Citation {
    pub fn from_chunk(chunk: &DocumentChunk) -> Self {
        Self {
            source: chunk.metadata.source.clone(),
            page_label: chunk.metadata.page_label.clone(),
        }
    }

    /// `` `guide.pdf` — Page 12 ``, with placeholders for missing metadata.
    pub fn display_line(&self) -> String {
        format!(
            "`{}` — Page {}",
            self.source.as_deref().unwrap_or(UNKNOWN_SOURCE),
            self.page_label.as_deref().unwrap_or(UNKNOWN_PAGE)
        )
    }
}

/// Result of one question: generated text plus the chunks that grounded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<ScoredChunk>,
}

impl Answer {
    pub fn new(text: String, sources: Vec<ScoredChunk>) -> Self {
        let citations = sources
            .iter()
            .map(|hit| Citation::from_chunk(&hit.chunk))
            .collect();
        Self {
            text,
            citations,
            sources,
        }
    }
}
