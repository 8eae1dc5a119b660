//! Error types for scribe-index.

use std::num::TryFromIntError;
use std::path::PathBuf;

/// Errors raised while ingesting or retrieving documentation chunks.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The directory handed to ingestion does not exist or is not a directory.
    #[error("directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("chunk {id} not found in collection {collection}")]
    ChunkNotFound { collection: String, id: String },

    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding or completion provider failure.
    #[error("LLM error: {0}")]
    Provider(#[from] scribe_llm::LlmError),

    #[error("vector store error: {0}")]
    Store(#[from] scribe_memory::VectorStoreError),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("chunk {0} has no vector")]
    MissingVector(String),

    /// A stored payload could not be decoded back into a chunk.
    #[error("malformed chunk payload: {0}")]
    Payload(String),

    /// Ingestion aborted part way. The first `stored` chunks remain in the collection.
    #[error("ingestion aborted after storing {stored} chunk(s): {source}")]
    Ingestion {
        stored: usize,
        #[source]
        source: Box<IndexError>,
    },

    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
