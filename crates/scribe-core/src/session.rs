//! The top-level loop: read an utterance, classify it, run the chosen workflow.

use scribe_llm::LlmProvider;

use crate::channel::{Channel, is_exit_command};
use crate::error::WorkflowError;
use crate::router::ModeClassifier;
use crate::workflow::WorkflowRegistry;

pub const SESSION_PROMPT: &str = "What would you like to do today?";
const DEFAULT_APP_NAME: &str = "Scribe";

/// Banner shown once when a session starts.
#[must_use]
pub fn welcome(app_name: &str) -> String {
    format!(
        "Welcome to {app_name}. I can help you with:\n\
  - chat: general questions and conversation\n\
  - commits: release notes from the latest commits of a git repository\n\
  - documentation: ingest, search and ask questions about a code base\n\
Type 'exit' to quit."
    )
}

pub struct Session<P: LlmProvider, C: Channel> {
    classifier: ModeClassifier<P>,
    registry: WorkflowRegistry<P>,
    channel: C,
    app_name: String,
}

impl<P: LlmProvider, C: Channel> Session<P, C> {
    #[must_use]
    pub fn new(classifier: ModeClassifier<P>, registry: WorkflowRegistry<P>, channel: C) -> Self {
        Self {
            classifier,
            registry,
            channel,
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }

    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Serve the operator until `exit`, `quit`, or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails.
    pub async fn run(&mut self) -> Result<(), WorkflowError> {
        self.channel.send(&welcome(&self.app_name)).await?;

        loop {
            let Some(line) = self.channel.prompt(SESSION_PROMPT).await? else {
                tracing::info!("input closed, ending session");
                return Ok(());
            };
            let line = line.trim();
            if is_exit_command(line) {
                tracing::info!("session ended by operator");
                return Ok(());
            }
            if line.is_empty() {
                continue;
            }

            let mode = self.classifier.classify(line).await;
            self.registry.dispatch(mode, &mut self.channel, line).await?;
        }
    }

    #[must_use]
    pub fn registry(&self) -> &WorkflowRegistry<P> {
        &self.registry
    }

    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    #[must_use]
    pub fn into_channel(self) -> C {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use scribe_llm::mock::MockProvider;

    use super::*;
    use crate::config::{CommitsConfig, PromptTemplates};
    use crate::git::GitRepository;
    use crate::testing::{IndexFixture, ScriptedChannel};
    use crate::workflow::{ChatWorkflow, CommitsWorkflow, DocumentationWorkflow};

    fn session(provider: &Arc<MockProvider>, inputs: &[&str]) -> Session<MockProvider, ScriptedChannel> {
        let templates = Arc::new(PromptTemplates::default());
        let timeout = Duration::from_secs(5);
        let fixture = IndexFixture::new(provider);
        let git = Arc::new(GitRepository::new());
        let registry = WorkflowRegistry::new(
            ChatWorkflow::new(
                Arc::clone(provider),
                fixture.tool_runner(Arc::clone(&git)),
                3,
                timeout,
            ),
            CommitsWorkflow::new(
                Arc::clone(provider),
                Arc::clone(&templates),
                git,
                CommitsConfig::default(),
                None,
                timeout,
            ),
            DocumentationWorkflow::new(fixture.indexer, fixture.retriever, fixture.settings),
        );
        Session::new(
            ModeClassifier::new(Arc::clone(provider), templates, timeout),
            registry,
            ScriptedChannel::new(inputs),
        )
    }

    #[tokio::test]
    async fn exit_before_any_request() {
        let provider = Arc::new(MockProvider::default());
        let mut s = session(&provider, &["", "  quit "]);
        s.run().await.unwrap();

        let ch = s.into_channel();
        assert_eq!(
            ch.sent,
            vec![welcome("Scribe").as_str(), SESSION_PROMPT, SESSION_PROMPT]
        );
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn classified_chat_then_back_to_top_level() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "chat".into(),
            "Hello!".into(),
        ]));
        let mut s = session(&provider, &["hi", "exit", "exit"]);
        s.run().await.unwrap();

        assert_eq!(s.registry().history().len(), 2);
        let ch = s.into_channel();
        assert_eq!(
            ch.sent,
            vec![
                welcome("Scribe").as_str(),
                SESSION_PROMPT,
                "Hello!",
                "You >",
                SESSION_PROMPT
            ]
        );
    }

    #[tokio::test]
    async fn unknown_label_falls_back_to_chat() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "banana".into(),
            "Sure.".into(),
        ]));
        let mut s = session(&provider, &["something odd"]);
        s.run().await.unwrap();

        assert_eq!(s.registry().history().len(), 2);
        assert!(s.channel().sent.contains(&"Sure.".to_owned()));
    }

    #[tokio::test]
    async fn documentation_mode_is_dispatched() {
        let provider = Arc::new(
            MockProvider::with_responses(vec!["documentation".into()]).with_hashed_embeddings(16),
        );
        let mut s = session(&provider, &["search for Cart", "exit"]);
        s.run().await.unwrap();

        let out = s.into_channel().output();
        assert!(out.contains("Searching documentation for: 'Cart'"));
        assert!(out.contains("No relevant documentation found."));
    }

    #[tokio::test]
    async fn banner_uses_configured_name() {
        let provider = Arc::new(MockProvider::default());
        let mut s = session(&provider, &[]).with_app_name("Shop Helper");
        s.run().await.unwrap();

        let ch = s.into_channel();
        assert!(ch.sent[0].starts_with("Welcome to Shop Helper. I can help you with:"));
    }
}
