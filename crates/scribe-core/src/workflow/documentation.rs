use std::path::Path;
use std::sync::Arc;

use scribe_index::{DocumentIndexer, DocumentRetriever, IngestProgress, format_search_results};
use scribe_llm::LlmProvider;
use tokio::sync::mpsc;

use super::{Workflow, report};
use crate::channel::{Channel, ChannelError, is_exit_command};
use crate::config::IndexConfig;
use crate::error::WorkflowError;
use crate::intent::{DocIntent, extract_directory, extract_extension};

const BANNER: &str = "Documentation mode: ingest or scan a directory, search the indexed code, \
or ask a question about it. Type 'exit' to leave.";
const DOCUMENTATION_PROMPT: &str = "Documentation>";
const DIRECTORY_PROMPT: &str = "Please enter the directory path to scan:";

/// Index settings shared by the documentation workflow and the chat tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationSettings {
    pub collection: String,
    pub default_extensions: String,
    pub search_limit: usize,
    pub context_limit: usize,
    pub preview_chars: usize,
}

impl Default for DocumentationSettings {
    fn default() -> Self {
        Self::from(&IndexConfig::default())
    }
}

impl From<&IndexConfig> for DocumentationSettings {
    fn from(config: &IndexConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            default_extensions: config.default_extensions.clone(),
            search_limit: config.search_limit,
            context_limit: config.context_limit,
            preview_chars: config.preview_chars,
        }
    }
}

pub(crate) fn render_progress(event: &IngestProgress) -> Option<String> {
    match event {
        IngestProgress::FileStarted { path, index, total } => {
            Some(format!("Processing file {}/{total}: {path}", index + 1))
        }
        IngestProgress::ChunkStored { element, kind, .. } => {
            Some(format!("  Generated documentation for {kind}: {element}"))
        }
        IngestProgress::FileFinished { chunks: 0, path } => {
            Some(format!("  No documentation generated for {path}"))
        }
        IngestProgress::FileFinished { .. } => None,
    }
}

/// Ingest, scan, search and answer over the code documentation collection.
pub struct DocumentationWorkflow<P: LlmProvider> {
    indexer: Arc<DocumentIndexer<P>>,
    retriever: Arc<DocumentRetriever<P>>,
    settings: Arc<DocumentationSettings>,
}

impl<P: LlmProvider> DocumentationWorkflow<P> {
    #[must_use]
    pub fn new(
        indexer: Arc<DocumentIndexer<P>>,
        retriever: Arc<DocumentRetriever<P>>,
        settings: Arc<DocumentationSettings>,
    ) -> Self {
        Self {
            indexer,
            retriever,
            settings,
        }
    }

    async fn directory<C: Channel>(channel: &mut C, utterance: &str) -> Result<Option<String>, WorkflowError> {
        if let Some(dir) = extract_directory(utterance) {
            return Ok(Some(dir));
        }
        let Some(answer) = channel.prompt(DIRECTORY_PROMPT).await? else {
            return Ok(None);
        };
        let answer = answer.trim();
        Ok(Some(if answer.is_empty() { ".".to_owned() } else { answer.to_owned() }))
    }

    async fn handle<C: Channel>(&self, channel: &mut C, utterance: &str) -> Result<(), WorkflowError> {
        let intent = DocIntent::classify(utterance);
        tracing::debug!(?intent, "documentation request");

        match intent {
            DocIntent::Ingest => {
                let Some(dir) = Self::directory(channel, utterance).await? else {
                    return Ok(());
                };
                let extensions = extract_extension(utterance, &self.settings.default_extensions);
                channel
                    .send(&format!(
                        "Ingesting code from directory: '{dir}' with extensions: {extensions}"
                    ))
                    .await?;
                let collection = &self.settings.collection;
                let summary = self
                    .indexer
                    .ingest_directory(Path::new(&dir), &extensions, collection)
                    .await?;
                channel
                    .send(&format!(
                        "Successfully ingested {} documentation chunks from {} files into collection '{collection}'.",
                        summary.chunk_count, summary.file_count
                    ))
                    .await?;
            }
            DocIntent::Scan => {
                let Some(dir) = Self::directory(channel, utterance).await? else {
                    return Ok(());
                };
                let extensions = extract_extension(utterance, &self.settings.default_extensions);
                channel
                    .send(&format!(
                        "Scanning directory: '{dir}' with extensions: {extensions}"
                    ))
                    .await?;
                self.scan(channel, &dir, &extensions).await?;
            }
            DocIntent::Search { query } => {
                channel
                    .send(&format!("Searching documentation for: '{query}'"))
                    .await?;
                let hits = self
                    .retriever
                    .search(&self.settings.collection, &query, self.settings.search_limit)
                    .await?;
                channel
                    .send(&format_search_results(&hits, self.settings.preview_chars))
                    .await?;
            }
            DocIntent::Question => {
                channel.send("Analyzing your question...").await?;
                let answer = self
                    .retriever
                    .answer(
                        &self.settings.collection,
                        utterance.trim(),
                        self.settings.context_limit,
                    )
                    .await?;
                channel.send(&answer).await?;
            }
        }
        Ok(())
    }

    async fn scan<C: Channel>(&self, channel: &mut C, dir: &str, extensions: &str) -> Result<(), WorkflowError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let collection = self.settings.collection.as_str();

        let scan = async move {
            let result = self
                .indexer
                .scan_directory(Path::new(dir), extensions, collection, Some(&tx))
                .await;
            drop(tx);
            result
        };
        let render = async {
            while let Some(event) = rx.recv().await {
                if let Some(line) = render_progress(&event) {
                    channel.send(&line).await?;
                }
            }
            Ok::<(), ChannelError>(())
        };

        let (summary, rendered) = tokio::join!(scan, render);
        rendered?;
        let summary = summary?;
        channel
            .send(&format!(
                "Successfully processed {} files, generated {} documentation chunks.",
                summary.file_count, summary.chunk_count
            ))
            .await?;
        Ok(())
    }
}

impl<P: LlmProvider> Workflow for DocumentationWorkflow<P> {
    async fn run<C: Channel>(&mut self, channel: &mut C, input: &str) -> Result<(), WorkflowError> {
        channel.send(BANNER).await?;
        let result = self.handle(channel, input).await;
        report(channel, result).await?;

        loop {
            let Some(line) = channel.prompt(DOCUMENTATION_PROMPT).await? else {
                return Ok(());
            };
            let line = line.trim();
            if line.is_empty() || is_exit_command(line) {
                return Ok(());
            }
            let result = self.handle(channel, line).await;
            report(channel, result).await?;
        }
    }
}
