use std::path::Path;

/// Document formats the ingestion step knows how to read.
pub fn is_supported_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    matches!(ext.as_str(), "pdf" | "txt" | "md" | "docx")
}
