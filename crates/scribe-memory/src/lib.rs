//! Vector storage for embedded documents: a backend-neutral trait, a volatile
//! in-memory implementation, and a Qdrant-backed one.

pub mod in_memory_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use vector_store::{
    RetrievedPoint, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};
