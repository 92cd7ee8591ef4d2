//! Loading documents from files and uploaded bytes.

use super::Document;
use crate::error::{PolicyRagError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, instrument, warn};

/// File extensions treated as plain text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

/// Page separator for plain-text documents.
const FORM_FEED: char = '\u{000C}';

/// Provides the raw text and page boundaries of a document by identifier.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the document with the given identifier.
    async fn load(&self, id: &str) -> Result<Document>;
}

/// Loads documents from the local filesystem.
///
/// PDFs are extracted page by page; plain-text files use form feeds as page breaks.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

impl FileSource {
    pub fn new() -> Self {
        Self
    }

    /// Load every supported document under the given paths.
    pub async fn load_all(&self, paths: &[PathBuf]) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in collect_paths(paths)? {
            documents.push(self.load(&path.to_string_lossy()).await?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    #[instrument(skip(self))]
    async fn load(&self, id: &str) -> Result<Document> {
        let path = Path::new(id);
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PolicyRagError::DocumentSource(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let document = parse_bytes(id, &bytes)?;
        debug!(
            "Loaded {} ({} pages, {} chars)",
            id,
            document.page_count(),
            document.text.chars().count()
        );
        Ok(document)
    }
}

/// Parse document bytes, choosing the extractor from the name's extension.
pub(crate) fn parse_bytes(name: &str, bytes: &[u8]) -> Result<Document> {
    match extension(Path::new(name)).as_deref() {
        Some("pdf") => {
            let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
                PolicyRagError::DocumentSource(format!("Failed to extract PDF text from {}: {}", name, e))
            })?;
            let pages: Vec<String> = pages.iter().map(|p| normalize_whitespace(p)).collect();
            Ok(Document::from_pages(name, &pages))
        }
        Some(ext) if TEXT_EXTENSIONS.contains(&ext) => {
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                PolicyRagError::DocumentSource(format!("{} is not valid UTF-8 text", name))
            })?;
            let pages: Vec<&str> = text.split(FORM_FEED).collect();
            Ok(Document::from_pages(name, &pages))
        }
        _ => Err(PolicyRagError::DocumentSource(format!(
            "Unsupported document type: {} (expected .pdf, .txt or .md)",
            name
        ))),
    }
}

/// Expand files and directories into a sorted list of supported document paths.
pub fn collect_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in paths {
        let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string());
        if path.is_dir() {
            walk(&path, &mut found)?;
        } else if path.is_file() {
            found.push(path);
        } else {
            return Err(PolicyRagError::DocumentSource(format!(
                "No such file or directory: {}",
                path.display()
            )));
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if is_supported(&path) {
            found.push(path);
        } else {
            warn!("Skipping unsupported file {}", path.display());
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    match extension(path).as_deref() {
        Some("pdf") => true,
        Some(ext) => TEXT_EXTENSIONS.contains(&ext),
        None => false,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Collapse runs of horizontal whitespace left behind by PDF text extraction.
fn normalize_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"));

    text.lines()
        .map(|line| spaces.replace_all(line.trim(), " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
