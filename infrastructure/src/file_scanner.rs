use docx_rs::{read_docx, DocumentChild};
use domain::models::DocumentChunk;
use memmap2::Mmap;
use rayon::prelude::*;
use shared::errors::BotError;
use shared::types::Result;
use shared::utils::is_supported_file;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;

/// One page (PDF) or whole document (text, markdown, docx).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_label: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct FileScanResult {
    pub source: String,
    pub page_count: usize,
    pub chunks: Vec<DocumentChunk>,
}

/// Walks a document directory and turns every supported file into chunks.
pub struct FileScanner {
    root_path: PathBuf,
    ignored_dirs: HashSet<String>,
    max_file_bytes: u64,
}

impl FileScanner {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ignored_dirs: [".git", ".cache", "vectorstore", "__pycache__"]
                .into_iter()
                .map(String::from)
                .collect(),
            // Medical handbooks run large; anything past this is skipped.
            max_file_bytes: 64 * 1024 * 1024,
        }
    }

    pub fn scan_files(&self) -> Result<Vec<FileScanResult>> {
        let files = self.collect_files()?;
        self.scan_paths(&files)
    }

    pub fn scan_paths(&self, paths: &[PathBuf]) -> Result<Vec<FileScanResult>> {
        tracing::info!(files = paths.len(), "scanning documents");
        // par_iter keeps input order in the collected output.
        paths
            .par_iter()
            .map(|path| self.load_and_chunk_file(path))
            .collect()
    }

    /// Supported files under the root, sorted so ingestion is reproducible.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root_path.is_dir() {
            return Err(BotError::Ingestion(format!(
                "document directory {} does not exist",
                self.root_path.display()
            )));
        }
        let mut files = Vec::new();
        self.collect_files_recursive(&self.root_path, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn collect_files_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| io_error(dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if self.ignored_dirs.contains(name) {
                        continue;
                    }
                }
                self.collect_files_recursive(&path, files)?;
            } else if is_supported_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Citation name for a file: its path relative to the document root.
    fn source_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root_path)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    fn load_and_chunk_file(&self, path: &Path) -> Result<FileScanResult> {
        let source = self.source_name(path);
        if let Ok(meta) = path.metadata() {
            if meta.len() > self.max_file_bytes {
                tracing::warn!(source = %source, bytes = meta.len(), "skipping oversized document");
                return Ok(FileScanResult {
                    source,
                    page_count: 0,
                    chunks: Vec::new(),
                });
            }
        }

        let pages = load_pages(path)?;
        let chunks = pages
            .iter()
            .flat_map(|page| {
                chunk_text(&page.text, CHUNK_SIZE, CHUNK_OVERLAP)
                    .into_iter()
                    .map(|text| DocumentChunk::new(text, Some(&source), page.page_label.as_deref()))
            })
            .collect();
        Ok(FileScanResult {
            source,
            page_count: pages.len(),
            chunks,
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> BotError {
    BotError::Ingestion(format!("{}: {}", path.display(), err))
}

/// Extract text per page. Only PDFs have pages; other formats yield one
/// unlabelled page.
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| {
                BotError::Ingestion(format!("cannot extract text from PDF {}: {}", path.display(), e))
            })?;
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page {
                    page_label: Some((i + 1).to_string()),
                    text,
                })
                .collect())
        }
        "docx" => {
            let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
            let docx = read_docx(&bytes)
                .map_err(|e| BotError::Ingestion(format!("cannot parse DOCX {}: {}", path.display(), e)))?;
            let mut text = String::new();
            for child in &docx.document.children {
                if let DocumentChild::Paragraph(p) = child {
                    text.push_str(&p.raw_text());
                    text.push('\n');
                }
            }
            Ok(vec![Page {
                page_label: None,
                text,
            }])
        }
        _ => Ok(vec![Page {
            page_label: None,
            text: read_text_file(path)?,
        }]),
    }
}

fn read_text_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let len = file.metadata().map_err(|e| io_error(path, e))?.len();
    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(String::new());
    }
    let mmap = unsafe { Mmap::map(&file).map_err(|e| io_error(path, e))? };
    // Lossy conversion ensures non-UTF8 bytes don't abort ingestion.
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Split `text` into pieces of at most `chunk_size` characters, each sharing
/// `overlap` characters with the previous one. Cuts prefer a paragraph, then
/// a line, then a word boundary in the back half of the window. Blank and
/// repeated pieces are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size / 2);
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut seen_hashes = HashSet::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + chunk_size).min(total);
        if end < total {
            let window = &text[bounds[start]..bounds[end]];
            let min_cut = (bounds[end] - bounds[start]) / 2;
            for sep in ["\n\n", "\n", " "] {
                if let Some(pos) = window.rfind(sep) {
                    let cut = pos + sep.len();
                    if cut > min_cut {
                        let byte = bounds[start] + cut;
                        end = bounds.binary_search(&byte).unwrap_or_else(|i| i);
                        break;
                    }
                }
            }
        }

        let piece = text[bounds[start]..bounds[end]].trim();
        if !piece.is_empty() {
            let hash = format!("{:x}", md5::compute(piece.as_bytes()));
            if seen_hashes.insert(hash) {
                chunks.push(piece.to_string());
            }
        }

        if end == total {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    chunks
}
