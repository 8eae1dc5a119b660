use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use scribe_index::{
    DocumentIndexer, DocumentRetriever, DocumentStore, IndexerConfig, RetrievalConfig,
};
use scribe_llm::mock::MockProvider;

use crate::channel::{Channel, ChannelError, ChannelMessage};
use crate::config::{CommitsConfig, PromptTemplates};
use crate::git::GitRepository;
use crate::release_notes::ReleaseNotesGenerator;
use crate::tools::ToolRunner;
use crate::workflow::DocumentationSettings;

/// Channel that replays canned input lines and records everything sent.
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    inputs: VecDeque<String>,
    pub sent: Vec<String>,
    pub chunks: Vec<String>,
    pub flushes: usize,
}

impl ScriptedChannel {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| (*s).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn output(&self) -> String {
        self.sent.join("\n")
    }
}

impl Channel for ScriptedChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        Ok(self.inputs.pop_front().map(|text| ChannelMessage { text }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.sent.push(text.to_owned());
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: &str) -> Result<(), ChannelError> {
        self.chunks.push(chunk.to_owned());
        Ok(())
    }

    async fn flush_chunks(&mut self) -> Result<(), ChannelError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Index collaborators over one in-memory store.
pub(crate) struct IndexFixture {
    provider: Arc<MockProvider>,
    pub indexer: Arc<DocumentIndexer<MockProvider>>,
    pub retriever: Arc<DocumentRetriever<MockProvider>>,
    pub settings: Arc<DocumentationSettings>,
}

impl IndexFixture {
    pub fn new(provider: &Arc<MockProvider>) -> Self {
        let store = Arc::new(DocumentStore::in_memory());
        Self {
            provider: Arc::clone(provider),
            indexer: Arc::new(DocumentIndexer::new(
                Arc::clone(&store),
                Arc::clone(provider),
                IndexerConfig::default(),
            )),
            retriever: Arc::new(DocumentRetriever::new(
                store,
                Arc::clone(provider),
                RetrievalConfig::default(),
            )),
            settings: Arc::new(DocumentationSettings::default()),
        }
    }

    pub fn tool_runner(&self, git: Arc<GitRepository>) -> Arc<ToolRunner<MockProvider>> {
        Arc::new(ToolRunner::new(
            git,
            Arc::clone(&self.indexer),
            Arc::clone(&self.retriever),
            Arc::clone(&self.settings),
            CommitsConfig::default(),
            ReleaseNotesGenerator::new(
                Arc::clone(&self.provider),
                Arc::new(PromptTemplates::default()),
                None,
                Duration::from_secs(5),
            ),
        ))
    }
}
