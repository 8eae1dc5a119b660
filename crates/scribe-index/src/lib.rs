//! Code documentation retrieval: source files are split into chunks, embedded,
//! stored in a vector collection, and searched to answer questions about the code.

pub mod chunker;
pub mod document;
pub mod error;
pub mod indexer;
pub mod retriever;
pub mod store;

pub use chunker::{BraceChunker, Chunker};
pub use document::{ChunkKind, ChunkMetadata, DocumentChunk};
pub use error::{IndexError, Result};
pub use indexer::{DocumentIndexer, IndexerConfig, IngestProgress, IngestSummary};
pub use retriever::{
    DocumentRetriever, RetrievalConfig, SearchHit, build_context, format_search_results,
};
pub use store::DocumentStore;
