//! Chunk model shared by the chunker, store, and retriever.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a chunk was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ChunkKind {
    /// A whole source file, used when no finer structure was found.
    File,
    /// A single class declaration.
    Class,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "class" => Some(Self::Class),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("File"),
            Self::Class => f.write_str("Class"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub kind: ChunkKind,
    /// Path relative to the ingested directory.
    pub file_name: String,
    pub element_name: String,
    pub namespace: Option<String>,
    /// Time the chunk was created, not the source file's mtime.
    pub last_modified: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// An addressable slice of source text, optionally carrying its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub vector: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// New chunk with a fresh random id and no vector.
    #[must_use]
    pub fn new(content: String, metadata: ChunkMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata,
            vector: None,
        }
    }

    /// Text handed to the embedding model: a short header naming the element, then the content.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!(
            "{}: {}\n\n{}",
            self.metadata.kind, self.metadata.element_name, self.content
        )
    }

    /// Copy of this chunk with the given vector attached.
    #[must_use]
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}
