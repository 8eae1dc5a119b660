//! Top-level intent routing: one classifier call picks the workflow for an utterance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scribe_llm::{ChatOptions, LlmError, LlmProvider, Message};

use crate::config::PromptTemplates;

const CLASSIFIER_MAX_TOKENS: u32 = 10;

/// The workflow an utterance is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Chat,
    Commits,
    Documentation,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Commits => "commits",
            Self::Documentation => "documentation",
        }
    }

    /// Parse classifier output after trimming whitespace, surrounding quotes, and
    /// trailing punctuation. Anything other than one of the three labels is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let label = raw
            .trim()
            .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .trim()
            .to_lowercase();
        match label.as_str() {
            "chat" => Some(Self::Chat),
            "commits" => Some(Self::Commits),
            "documentation" => Some(Self::Documentation),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why classification fell back to [`Mode::Chat`]. Never leaves this module's public API.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("classifier returned an empty reply")]
    Empty,

    #[error("classifier returned an unknown label: {0:?}")]
    UnknownLabel(String),

    #[error("classifier timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Provider(#[from] LlmError),
}

/// Maps an utterance to a [`Mode`] with a single deterministic completion call.
pub struct ModeClassifier<P: LlmProvider> {
    provider: Arc<P>,
    templates: Arc<PromptTemplates>,
    timeout: Duration,
}

impl<P: LlmProvider> ModeClassifier<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, templates: Arc<PromptTemplates>, timeout: Duration) -> Self {
        Self {
            provider,
            templates,
            timeout,
        }
    }

    /// Classify `input`. Every failure collapses to [`Mode::Chat`].
    pub async fn classify(&self, input: &str) -> Mode {
        match self.try_classify(input).await {
            Ok(mode) => {
                tracing::debug!(%mode, "utterance classified");
                mode
            }
            Err(e) => {
                tracing::warn!("mode classification failed, falling back to chat: {e}");
                Mode::Chat
            }
        }
    }

    async fn try_classify(&self, input: &str) -> Result<Mode, ClassificationError> {
        let messages = [
            Message::system(self.templates.mode_classifier.clone()),
            Message::user(input),
        ];
        let options = ChatOptions::deterministic(CLASSIFIER_MAX_TOKENS);
        let reply = tokio::time::timeout(
            self.timeout,
            self.provider.chat_with_options(&messages, &options),
        )
        .await
        .map_err(|_| ClassificationError::Timeout(self.timeout.as_secs()))??;

        if reply.trim().is_empty() {
            return Err(ClassificationError::Empty);
        }
        Mode::parse(&reply).ok_or(ClassificationError::UnknownLabel(reply))
    }
}
