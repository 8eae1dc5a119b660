//! Directory ingestion: walk → chunk → embed → store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scribe_llm::LlmProvider;
use tokio::sync::mpsc::UnboundedSender;

use crate::chunker::{BraceChunker, Chunker};
use crate::document::{ChunkKind, DocumentChunk};
use crate::error::{IndexError, Result};
use crate::store::DocumentStore;

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chunks per backend upsert in bulk mode.
    pub upsert_batch_size: usize,
    /// Skip hidden files and honor `.gitignore` rules while walking.
    pub respect_gitignore: bool,
    pub embedding_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: 64,
            respect_gitignore: false,
            embedding_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a successful ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub chunk_count: usize,
    pub file_count: usize,
}

/// Events emitted by [`DocumentIndexer::scan_directory`], in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestProgress {
    FileStarted {
        path: String,
        index: usize,
        total: usize,
    },
    ChunkStored {
        path: String,
        element: String,
        kind: ChunkKind,
    },
    FileFinished {
        path: String,
        chunks: usize,
    },
}

/// Split an extension allow-list such as `".cs, .java"` into trimmed, non-empty suffixes.
#[must_use]
pub fn parse_extension_filter(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn wrap(stored: usize) -> impl FnOnce(IndexError) -> IndexError {
    move |source| IndexError::Ingestion {
        stored,
        source: Box::new(source),
    }
}

/// Ingests source directories into a named collection.
pub struct DocumentIndexer<P: LlmProvider> {
    store: Arc<DocumentStore>,
    provider: Arc<P>,
    chunker: Arc<dyn Chunker>,
    config: IndexerConfig,
}

impl<P: LlmProvider> DocumentIndexer<P> {
    #[must_use]
    pub fn new(store: Arc<DocumentStore>, provider: Arc<P>, config: IndexerConfig) -> Self {
        Self {
            store,
            provider,
            chunker: Arc::new(BraceChunker),
            config,
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// Chunk every matching file first, then embed and store them in batches.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if `directory` is missing, or
    /// [`IndexError::Ingestion`] if embedding or storage fails part way. Chunks
    /// stored before the failure stay in the collection.
    pub async fn ingest_directory(
        &self,
        directory: &Path,
        extension_filter: &str,
        collection: &str,
    ) -> Result<IngestSummary> {
        check_directory(directory).await?;
        let _guard = self.store.lock_collection(collection).await;

        let files = self.collect_files(directory, extension_filter).await?;
        let mut pending = Vec::new();
        for file in &files {
            let chunks = self.chunk_file(directory, file).await.map_err(wrap(0))?;
            pending.extend(chunks);
        }
        tracing::info!(
            collection,
            files = files.len(),
            chunks = pending.len(),
            "bulk ingestion started"
        );

        let batch_size = self.config.upsert_batch_size.max(1);
        let total = pending.len();
        let mut stored = 0usize;
        let mut ensured = false;
        for batch in pending.chunks(batch_size) {
            let mut embedded = Vec::with_capacity(batch.len());
            for chunk in batch {
                let vector = self.embed(chunk).await.map_err(wrap(stored))?;
                if !ensured {
                    self.store
                        .ensure_collection(collection, vector.len())
                        .await
                        .map_err(wrap(stored))?;
                    ensured = true;
                }
                embedded.push(chunk.clone().with_vector(vector));
            }
            self.store
                .upsert_batch(collection, &embedded)
                .await
                .map_err(wrap(stored))?;
            stored += embedded.len();
            tracing::debug!(collection, stored, total, "ingestion progress");
        }

        tracing::info!(collection, stored, "bulk ingestion completed");
        Ok(IngestSummary {
            chunk_count: stored,
            file_count: files.len(),
        })
    }

    /// Process files one at a time, storing each chunk as soon as it is embedded.
    ///
    /// Progress events are sent on `progress` when given.
    ///
    /// # Errors
    ///
    /// Same as [`ingest_directory`](Self::ingest_directory).
    pub async fn scan_directory(
        &self,
        directory: &Path,
        extension_filter: &str,
        collection: &str,
        progress: Option<&UnboundedSender<IngestProgress>>,
    ) -> Result<IngestSummary> {
        check_directory(directory).await?;
        let _guard = self.store.lock_collection(collection).await;

        let emit = |event: IngestProgress| {
            if let Some(tx) = progress {
                let _ = tx.send(event);
            }
        };

        let files = self.collect_files(directory, extension_filter).await?;
        let total = files.len();
        tracing::info!(collection, total, "incremental ingestion started");

        let mut stored = 0usize;
        let mut ensured = false;
        for (index, file) in files.iter().enumerate() {
            let rel = relative_path(directory, file);
            emit(IngestProgress::FileStarted {
                path: rel.clone(),
                index,
                total,
            });

            let chunks = self
                .chunk_file(directory, file)
                .await
                .map_err(wrap(stored))?;
            let file_chunks = chunks.len();
            for chunk in chunks {
                let vector = self.embed(&chunk).await.map_err(wrap(stored))?;
                if !ensured {
                    self.store
                        .ensure_collection(collection, vector.len())
                        .await
                        .map_err(wrap(stored))?;
                    ensured = true;
                }
                let chunk = chunk.with_vector(vector);
                self.store
                    .upsert(collection, &chunk)
                    .await
                    .map_err(wrap(stored))?;
                stored += 1;
                emit(IngestProgress::ChunkStored {
                    path: rel.clone(),
                    element: chunk.metadata.element_name,
                    kind: chunk.metadata.kind,
                });
            }

            tracing::debug!(file = %rel, chunks = file_chunks, progress = format_args!("{}/{total}", index + 1));
            emit(IngestProgress::FileFinished {
                path: rel,
                chunks: file_chunks,
            });
        }

        tracing::info!(collection, stored, files = total, "incremental ingestion completed");
        Ok(IngestSummary {
            chunk_count: stored,
            file_count: total,
        })
    }

    /// Matching files under `directory`, recursively, in path order.
    async fn collect_files(&self, directory: &Path, extension_filter: &str) -> Result<Vec<PathBuf>> {
        let suffixes = parse_extension_filter(extension_filter);
        if suffixes.is_empty() {
            return Ok(Vec::new());
        }
        let root = directory.to_path_buf();
        let respect = self.config.respect_gitignore;
        tokio::task::spawn_blocking(move || walk_files(&root, &suffixes, respect))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(format!("directory walk failed: {e}"))))
    }

    async fn chunk_file(&self, root: &Path, path: &Path) -> Result<Vec<DocumentChunk>> {
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes);
        let rel = relative_path(root, path);
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Ok(self.chunker.chunk(&content, &rel, &extension))
    }

    async fn embed(&self, chunk: &DocumentChunk) -> Result<Vec<f32>> {
        let text = chunk.embedding_text();
        match tokio::time::timeout(self.config.embedding_timeout, self.provider.embed(&text)).await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(IndexError::Timeout {
                operation: "embedding",
                seconds: self.config.embedding_timeout.as_secs(),
            }),
        }
    }
}

fn walk_files(root: &Path, suffixes: &[String], respect_gitignore: bool) -> Vec<PathBuf> {
    ignore::WalkBuilder::new(root)
        .hidden(respect_gitignore)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore)
        .git_exclude(respect_gitignore)
        .ignore(respect_gitignore)
        .parents(respect_gitignore)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| {
            let name = path.to_string_lossy();
            suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
        .collect()
}

async fn check_directory(directory: &Path) -> Result<()> {
    match tokio::fs::metadata(directory).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(IndexError::NotFound {
            path: directory.to_path_buf(),
        }),
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
