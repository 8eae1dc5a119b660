//! Typed chunk access over any [`VectorStore`] backend.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use scribe_memory::{InMemoryVectorStore, VectorPoint, VectorStore, VectorStoreError};
use serde_json::{Value, json};
use tokio::sync::OwnedMutexGuard;

use crate::document::{ChunkKind, ChunkMetadata, DocumentChunk};
use crate::error::{IndexError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps [`DocumentChunk`]s to vector points and back, one collection per call.
pub struct DocumentStore {
    backend: Arc<dyn VectorStore>,
    timeout: Duration,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    #[must_use]
    pub fn new(backend: Arc<dyn VectorStore>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Store backed by a fresh [`InMemoryVectorStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryVectorStore::new()))
    }

    /// Bound every backend call by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Acquire the writer lock for `collection`. Held for a whole ingestion run.
    pub async fn lock_collection(&self, collection: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(collection.to_owned()).or_default())
        };
        lock.lock_owned().await
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = std::result::Result<T, VectorStoreError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(VectorStoreError::CollectionNotFound(name))) => {
                Err(IndexError::CollectionNotFound(name))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(IndexError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Create `collection` for vectors of `dimension` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the collection or times out.
    pub async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let dimension = u64::try_from(dimension)?;
        self.call(
            "ensure collection",
            self.backend.ensure_collection(collection, dimension),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.call(
            "collection lookup",
            self.backend.collection_exists(collection),
        )
        .await
    }

    /// Insert or replace one chunk. The chunk must carry a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk has no vector, the collection is missing, or the backend fails.
    pub async fn upsert(&self, collection: &str, chunk: &DocumentChunk) -> Result<()> {
        self.upsert_batch(collection, std::slice::from_ref(chunk))
            .await
    }

    /// Insert or replace a batch of chunks in one backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if any chunk has no vector, the collection is missing, or the backend fails.
    pub async fn upsert_batch(&self, collection: &str, chunks: &[DocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let points = chunks
            .iter()
            .map(chunk_to_point)
            .collect::<Result<Vec<_>>>()?;
        self.call("upsert", self.backend.upsert(collection, points))
            .await
    }

    /// Fetch a chunk by id.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CollectionNotFound`] or [`IndexError::ChunkNotFound`] when absent.
    pub async fn get(&self, collection: &str, id: &str) -> Result<DocumentChunk> {
        let point = self
            .call("get", self.backend.get(collection, id))
            .await?
            .ok_or_else(|| IndexError::ChunkNotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            })?;
        chunk_from_payload(point.id, &point.payload, point.vector)
    }

    /// Remove a chunk by id. Removing an id that is not stored is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CollectionNotFound`] when the collection does not exist.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if !self.collection_exists(collection).await? {
            return Err(IndexError::CollectionNotFound(collection.to_owned()));
        }
        self.call(
            "delete",
            self.backend.delete_by_ids(collection, vec![id.to_owned()]),
        )
        .await
    }

    /// Drop a collection and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CollectionNotFound`] when the collection does not exist.
    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        if !self.collection_exists(collection).await? {
            return Err(IndexError::CollectionNotFound(collection.to_owned()));
        }
        self.call(
            "delete collection",
            self.backend.delete_collection(collection),
        )
        .await
    }

    /// Nearest chunks to `vector`, best first. A collection that was never written is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or a payload cannot be decoded.
    pub async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<(DocumentChunk, f32)>> {
        if limit == 0 || !self.collection_exists(collection).await? {
            return Ok(Vec::new());
        }
        let limit = u64::try_from(limit)?;
        let scored = self
            .call("search", self.backend.search(collection, vector, limit))
            .await?;
        scored
            .into_iter()
            .map(|p| Ok((chunk_from_payload(p.id, &p.payload, None)?, p.score)))
            .collect()
    }

    /// Number of chunks in `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CollectionNotFound`] when the collection does not exist.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        self.call("count", self.backend.count(collection)).await
    }
}

fn chunk_to_point(chunk: &DocumentChunk) -> Result<VectorPoint> {
    let vector = chunk
        .vector
        .clone()
        .ok_or_else(|| IndexError::MissingVector(chunk.id.clone()))?;
    let meta = &chunk.metadata;
    let payload = HashMap::from([
        ("content".to_owned(), json!(chunk.content)),
        ("kind".to_owned(), json!(meta.kind.as_str())),
        ("file_name".to_owned(), json!(meta.file_name)),
        ("element_name".to_owned(), json!(meta.element_name)),
        ("namespace".to_owned(), json!(meta.namespace)),
        (
            "last_modified".to_owned(),
            json!(meta.last_modified.to_rfc3339()),
        ),
        ("tags".to_owned(), json!(meta.tags)),
    ]);
    Ok(VectorPoint {
        id: chunk.id.clone(),
        vector,
        payload,
    })
}

fn str_field<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| IndexError::Payload(format!("missing string field `{key}`")))
}

fn chunk_from_payload(
    id: String,
    payload: &HashMap<String, Value>,
    vector: Option<Vec<f32>>,
) -> Result<DocumentChunk> {
    let kind_str = str_field(payload, "kind")?;
    let kind = ChunkKind::parse(kind_str)
        .ok_or_else(|| IndexError::Payload(format!("unknown chunk kind `{kind_str}`")))?;
    let last_modified = DateTime::parse_from_rfc3339(str_field(payload, "last_modified")?)
        .map_err(|e| IndexError::Payload(format!("bad timestamp: {e}")))?
        .with_timezone(&Utc);
    let tags = payload
        .get("tags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(DocumentChunk {
        id,
        content: str_field(payload, "content")?.to_owned(),
        metadata: ChunkMetadata {
            kind,
            file_name: str_field(payload, "file_name")?.to_owned(),
            element_name: str_field(payload, "element_name")?.to_owned(),
            namespace: payload
                .get("namespace")
                .and_then(Value::as_str)
                .map(str::to_owned),
            last_modified,
            tags,
        },
        vector,
    })
}
