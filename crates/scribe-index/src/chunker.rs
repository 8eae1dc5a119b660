//! Splitting source text into documentation chunks.

use std::path::Path;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::document::{ChunkKind, ChunkMetadata, DocumentChunk};

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bclass\s+([A-Za-z_]\w*)").expect("class declaration regex is valid")
});

static NAMESPACE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:namespace|package)\s+([A-Za-z_][\w.]*)")
        .expect("namespace regex is valid")
});

/// Extensions whose files are scanned for class declarations.
const BRACE_LANGUAGES: &[&str] = &["cs", "java", "js", "ts", "cpp", "hpp", "kt", "swift", "php"];

/// Turns one file's text into chunks, in discovery order.
///
/// Implementations must be pure: same input, same chunk contents (ids are fresh each call).
pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str, file_path: &str, extension: &str) -> Vec<DocumentChunk>;
}

/// Heuristic class extractor for brace-delimited languages.
///
/// A class chunk runs from the `class` keyword to the first `}` after it, which
/// is usually the end of the first member, not of the class. Files with no
/// class chunk become a single file chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceChunker;

impl BraceChunker {
    fn supports(extension: &str) -> bool {
        let ext = extension.trim_start_matches('.');
        BRACE_LANGUAGES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }

    fn class_chunks(content: &str, file_path: &str, namespace: Option<&str>) -> Vec<DocumentChunk> {
        CLASS_DECL
            .captures_iter(content)
            .filter_map(|caps| {
                let decl = caps.get(0)?;
                let name = caps.get(1)?.as_str();
                let start = decl.start();
                let end = start + content[start..].find('}')?;
                let metadata = ChunkMetadata {
                    kind: ChunkKind::Class,
                    file_name: file_path.to_owned(),
                    element_name: name.to_owned(),
                    namespace: namespace.map(str::to_owned),
                    last_modified: Utc::now(),
                    tags: vec!["class".to_owned(), name.to_owned()],
                };
                Some(DocumentChunk::new(
                    content[start..=end].to_owned(),
                    metadata,
                ))
            })
            .collect()
    }
}

impl Chunker for BraceChunker {
    fn chunk(&self, content: &str, file_path: &str, extension: &str) -> Vec<DocumentChunk> {
        let namespace = NAMESPACE_DECL
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        if Self::supports(extension) {
            let chunks = Self::class_chunks(content, file_path, namespace);
            if !chunks.is_empty() {
                return chunks;
            }
        }

        let element_name = Path::new(file_path)
            .file_name()
            .map_or_else(|| file_path.to_owned(), |n| n.to_string_lossy().into_owned());
        let metadata = ChunkMetadata {
            kind: ChunkKind::File,
            file_name: file_path.to_owned(),
            element_name,
            namespace: namespace.map(str::to_owned),
            last_modified: Utc::now(),
            tags: vec!["file".to_owned(), extension.to_owned()],
        };
        vec![DocumentChunk::new(content.to_owned(), metadata)]
    }
}
