//! Release notes from a commit list.

use std::sync::Arc;
use std::time::Duration;

use scribe_llm::{ChatOptions, LlmProvider, Message};

use crate::config::PromptTemplates;
use crate::error::WorkflowError;

const COMMITS_PLACEHOLDER: &str = "{{$commits}}";

/// Substitute the commit list into a release-notes template.
#[must_use]
pub fn render_template(template: &str, commits: &str) -> String {
    template.replace(COMMITS_PLACEHOLDER, commits)
}

pub struct ReleaseNotesGenerator<P: LlmProvider> {
    provider: Arc<P>,
    templates: Arc<PromptTemplates>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl<P: LlmProvider> ReleaseNotesGenerator<P> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        templates: Arc<PromptTemplates>,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            templates,
            max_tokens,
            timeout,
        }
    }

    /// One completion call with the rendered template as system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion call fails or times out.
    pub async fn generate(&self, commits: &str) -> Result<String, WorkflowError> {
        let messages = [
            Message::system(render_template(&self.templates.release_notes, commits)),
            Message::user(format!(
                "Here are the commits to summarize into release notes:\n\n{commits}"
            )),
        ];
        let options = ChatOptions {
            max_tokens: self.max_tokens,
            temperature: None,
        };

        let notes = tokio::time::timeout(
            self.timeout,
            self.provider.chat_with_options(&messages, &options),
        )
        .await
        .map_err(|_| WorkflowError::Timeout {
            operation: "release notes generation",
            seconds: self.timeout.as_secs(),
        })??;
        tracing::debug!(chars = notes.len(), "release notes generated");
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use scribe_llm::mock::MockProvider;

    use super::*;

    #[test]
    fn placeholder_is_replaced_everywhere() {
        assert_eq!(
            render_template("A {{$commits}} B {{$commits}}", "x"),
            "A x B x"
        );
        assert_eq!(render_template("no placeholder", "x"), "no placeholder");
    }

    #[tokio::test]
    async fn generate_sends_template_and_commits() {
        let provider = Arc::new(MockProvider::with_responses(vec!["## Fixes\n- a".into()]));
        let templates = Arc::new(PromptTemplates {
            release_notes: "Notes for:\n{{$commits}}".into(),
            ..PromptTemplates::default()
        });
        let generator = ReleaseNotesGenerator::new(
            Arc::clone(&provider),
            templates,
            Some(300),
            Duration::from_secs(5),
        );

        let notes = generator.generate("- fix a (Ada, 2024-01-01)\n").await.unwrap();
        assert_eq!(notes, "## Fixes\n- a");

        let request = &provider.requests()[0];
        assert_eq!(
            request.messages[0].content,
            "Notes for:\n- fix a (Ada, 2024-01-01)\n"
        );
        assert_eq!(
            request.messages[1].content,
            "Here are the commits to summarize into release notes:\n\n- fix a (Ada, 2024-01-01)\n"
        );
        assert_eq!(request.options.max_tokens, Some(300));
    }

    #[tokio::test]
    async fn generate_propagates_provider_error() {
        let generator = ReleaseNotesGenerator::new(
            Arc::new(MockProvider::failing()),
            Arc::new(PromptTemplates::default()),
            None,
            Duration::from_secs(5),
        );
        assert!(matches!(
            generator.generate("- a").await,
            Err(WorkflowError::Llm(_))
        ));
    }
}
