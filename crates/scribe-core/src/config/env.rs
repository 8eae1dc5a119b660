use std::path::PathBuf;

use super::Config;
use crate::secret::Secret;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_index();
        self.apply_env_overrides_runtime();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LLM_MAX_TOKENS") {
            if let Ok(tokens) = v.parse::<u32>() {
                self.llm.max_tokens = tokens;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_LLM_MAX_TOKENS value: {v}");
            }
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_VECTOR_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.vector_store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_VECTOR_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_QDRANT_URL") {
            self.vector_store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_INDEX_COLLECTION")
            && !v.trim().is_empty()
        {
            self.index.collection = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_INDEX_EXTENSIONS") {
            self.index.default_extensions = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_INDEX_SEARCH_LIMIT") {
            if let Ok(limit) = v.parse::<usize>() {
                self.index.search_limit = limit;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_INDEX_SEARCH_LIMIT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_INDEX_CONTEXT_LIMIT") {
            if let Ok(limit) = v.parse::<usize>() {
                self.index.context_limit = limit;
            } else {
                tracing::warn!("ignoring invalid SCRIBE_INDEX_CONTEXT_LIMIT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SCRIBE_INDEX_RESPECT_GITIGNORE")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.index.respect_gitignore = enabled;
        }
    }

    fn apply_env_overrides_runtime(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_CHAT_MAX_TOOL_ITERATIONS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chat.max_tool_iterations = n;
        }
        if let Ok(v) = std::env::var("SCRIBE_RELEASE_NOTES_PROMPT") {
            self.prompts.release_notes_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("SCRIBE_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("SCRIBE_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("SCRIBE_TIMEOUT_VECTOR")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.vector_seconds = secs;
        }
        if let Ok(v) = std::env::var("SCRIBE_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
    }

    /// Pick up API keys from the environment.
    pub fn resolve_secrets(&mut self) {
        if let Ok(v) = std::env::var("SCRIBE_OPENAI_API_KEY")
            && !v.is_empty()
        {
            self.secrets.openai_api_key = Some(Secret::new(v));
        }
    }
}
