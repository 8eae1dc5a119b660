//! Application bootstrap: config resolution, provider, vector store and session construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use scribe_index::{DocumentIndexer, DocumentRetriever, DocumentStore, IndexerConfig, RetrievalConfig};
use scribe_llm::LlmProvider;
use scribe_llm::any::AnyProvider;
use scribe_llm::ollama::OllamaProvider;
use scribe_llm::openai::OpenAiProvider;
use scribe_memory::{InMemoryVectorStore, QdrantOps, VectorStore};

use crate::channel::Channel;
use crate::config::{Config, PromptTemplates, ProviderKind, VectorBackend};
use crate::git::GitRepository;
use crate::release_notes::ReleaseNotesGenerator;
use crate::router::ModeClassifier;
use crate::session::Session;
use crate::tools::ToolRunner;
use crate::workflow::{
    ChatWorkflow, CommitsWorkflow, DocumentationSettings, DocumentationWorkflow, WorkflowRegistry,
};

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load config from `path`, apply env overrides, resolve secrets, validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed or fails validation.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let mut config = Config::load(path)?;
        config.resolve_secrets();
        config.validate()?;
        Ok(Self {
            config,
            config_path: path.to_owned(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Construct the configured provider and probe it.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be constructed.
    pub async fn build_provider(&self) -> anyhow::Result<AnyProvider> {
        let provider = create_provider(&self.config)?;
        health_check(&provider).await;
        Ok(provider)
    }

    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn build_store(&self) -> anyhow::Result<Arc<DocumentStore>> {
        build_store(&self.config)
    }

    /// # Errors
    ///
    /// Returns an error if a configured prompt template cannot be read.
    pub fn build_session<P: LlmProvider, C: Channel>(
        &self,
        provider: Arc<P>,
        store: Arc<DocumentStore>,
        channel: C,
    ) -> anyhow::Result<Session<P, C>> {
        build_session(&self.config, provider, store, channel)
    }
}

/// # Errors
///
/// Returns an error if the `openai` provider is selected without its section or API key.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            llm.embedding_model.clone(),
        ))),
        ProviderKind::OpenAi => {
            let openai = llm
                .openai
                .as_ref()
                .context("llm.openai config section required for openai provider")?;
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("SCRIBE_OPENAI_API_KEY not found")?;
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key.expose().to_owned(),
                openai.base_url.clone(),
                openai.model.clone(),
                openai.max_tokens,
                openai.embedding_model.clone(),
            )))
        }
    }
}

pub async fn health_check(provider: &AnyProvider) {
    match provider {
        AnyProvider::Ollama(ollama) => match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        },
        _ => {}
    }
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn build_store(config: &Config) -> anyhow::Result<Arc<DocumentStore>> {
    let backend: Arc<dyn VectorStore> = match config.vector_store.backend {
        VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        VectorBackend::Qdrant => {
            let url = &config.vector_store.qdrant_url;
            let ops = QdrantOps::new(url)
                .with_context(|| format!("failed to create Qdrant client for {url}"))?;
            tracing::info!(url = %url, "using qdrant vector store");
            Arc::new(ops)
        }
    };
    Ok(Arc::new(
        DocumentStore::new(backend).with_timeout(config.timeouts.vector()),
    ))
}

/// Wire every collaborator for one session over `provider`, `store` and `channel`.
///
/// # Errors
///
/// Returns an error if a configured prompt template cannot be read.
pub fn build_session<P: LlmProvider, C: Channel>(
    config: &Config,
    provider: Arc<P>,
    store: Arc<DocumentStore>,
    channel: C,
) -> anyhow::Result<Session<P, C>> {
    let templates = Arc::new(PromptTemplates::load(&config.prompts)?);
    let timeouts = config.timeouts;
    let max_tokens = Some(config.llm.max_tokens);

    let indexer = Arc::new(DocumentIndexer::new(
        Arc::clone(&store),
        Arc::clone(&provider),
        IndexerConfig {
            upsert_batch_size: config.index.upsert_batch_size,
            respect_gitignore: config.index.respect_gitignore,
            embedding_timeout: timeouts.embedding(),
        },
    ));
    let retriever = Arc::new(DocumentRetriever::new(
        store,
        Arc::clone(&provider),
        RetrievalConfig {
            max_context_chars: config.index.max_context_chars,
            max_answer_tokens: max_tokens,
            embedding_timeout: timeouts.embedding(),
            llm_timeout: timeouts.llm(),
            qa_instruction: templates.qa_instruction.clone(),
        },
    ));
    let settings = Arc::new(DocumentationSettings::from(&config.index));
    let git = Arc::new(GitRepository::new());

    let tools = Arc::new(ToolRunner::new(
        Arc::clone(&git),
        Arc::clone(&indexer),
        Arc::clone(&retriever),
        Arc::clone(&settings),
        config.commits,
        ReleaseNotesGenerator::new(
            Arc::clone(&provider),
            Arc::clone(&templates),
            max_tokens,
            timeouts.llm(),
        ),
    ));
    let registry = WorkflowRegistry::new(
        ChatWorkflow::new(
            Arc::clone(&provider),
            tools,
            config.chat.max_tool_iterations,
            timeouts.llm(),
        ),
        CommitsWorkflow::new(
            Arc::clone(&provider),
            Arc::clone(&templates),
            git,
            config.commits,
            max_tokens,
            timeouts.llm(),
        ),
        DocumentationWorkflow::new(indexer, retriever, settings),
    );
    let classifier = ModeClassifier::new(provider, templates, timeouts.llm());

    tracing::info!(
        provider = config.llm.provider.as_str(),
        collection = %config.index.collection,
        "session ready"
    );
    Ok(Session::new(classifier, registry, channel).with_app_name(config.app.name.clone()))
}
