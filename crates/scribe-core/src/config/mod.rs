mod env;
mod prompts;
mod types;


pub use prompts::PromptTemplates;
pub use types::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings the workflows cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.provider == ProviderKind::OpenAi && self.llm.openai.is_none() {
            bail!("llm.openai config section required for openai provider");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than zero");
        }
        if self.index.collection.trim().is_empty() {
            bail!("index.collection must not be empty");
        }
        for (name, value) in [
            ("index.search_limit", self.index.search_limit),
            ("index.context_limit", self.index.context_limit),
            ("index.preview_chars", self.index.preview_chars),
            ("index.max_context_chars", self.index.max_context_chars),
            ("index.upsert_batch_size", self.index.upsert_batch_size),
            ("chat.max_tool_iterations", self.chat.max_tool_iterations),
            ("commits.default_count", self.commits.default_count),
            ("commits.max_count", self.commits.max_count),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        if self.commits.default_count > self.commits.max_count {
            bail!(
                "commits.default_count ({}) exceeds commits.max_count ({})",
                self.commits.default_count,
                self.commits.max_count
            );
        }
        for (name, value) in [
            ("timeouts.llm_seconds", self.timeouts.llm_seconds),
            ("timeouts.embedding_seconds", self.timeouts.embedding_seconds),
            ("timeouts.vector_seconds", self.timeouts.vector_seconds),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_seconds)
    }

    #[must_use]
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_seconds)
    }

    #[must_use]
    pub fn vector(&self) -> Duration {
        Duration::from_secs(self.vector_seconds)
    }
}

/// Config file location: `--config` value, then `SCRIBE_CONFIG`, then `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SCRIBE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
