use std::sync::Arc;
use std::time::Duration;

use scribe_llm::LlmProvider;

use super::{Workflow, report};
use crate::channel::Channel;
use crate::commits::extract_commit_count;
use crate::config::{CommitsConfig, PromptTemplates};
use crate::error::WorkflowError;
use crate::git::GitRepository;
use crate::release_notes::ReleaseNotesGenerator;

const REPOSITORY_PROMPT: &str = "Enter the path to your Git repository:";

/// Single-shot release notes: ask for the repository, read commits, summarize.
pub struct CommitsWorkflow<P: LlmProvider> {
    provider: Arc<P>,
    templates: Arc<PromptTemplates>,
    git: Arc<GitRepository>,
    generator: ReleaseNotesGenerator<P>,
    config: CommitsConfig,
    timeout: Duration,
}

impl<P: LlmProvider> CommitsWorkflow<P> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        templates: Arc<PromptTemplates>,
        git: Arc<GitRepository>,
        config: CommitsConfig,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Self {
        let generator = ReleaseNotesGenerator::new(
            Arc::clone(&provider),
            Arc::clone(&templates),
            max_tokens,
            timeout,
        );
        Self {
            provider,
            templates,
            git,
            generator,
            config,
            timeout,
        }
    }

    async fn release_notes<C: Channel>(&self, channel: &mut C, input: &str) -> Result<(), WorkflowError> {
        let Some(path) = channel.prompt(REPOSITORY_PROMPT).await? else {
            return Ok(());
        };
        self.git.set_repository_path(path.trim()).await;

        let count = extract_commit_count(
            self.provider.as_ref(),
            &self.templates,
            input,
            self.config,
            self.timeout,
        )
        .await;
        tracing::info!(count, "generating release notes");

        let commits = self.git.latest_commits(count).await?;
        let notes = self.generator.generate(&commits).await?;
        channel.send(&format!("Release Notes:\n{notes}")).await?;
        Ok(())
    }
}

impl<P: LlmProvider> Workflow for CommitsWorkflow<P> {
    async fn run<C: Channel>(&mut self, channel: &mut C, input: &str) -> Result<(), WorkflowError> {
        let result = self.release_notes(channel, input).await;
        report(channel, result).await
    }
}

#[cfg(test)]
mod tests {
    use scribe_llm::mock::MockProvider;

    use super::*;
    use crate::testing::ScriptedChannel;

    fn workflow(provider: &Arc<MockProvider>, git: &Arc<GitRepository>) -> CommitsWorkflow<MockProvider> {
        CommitsWorkflow::new(
            Arc::clone(provider),
            Arc::new(PromptTemplates::default()),
            Arc::clone(git),
            CommitsConfig::default(),
            Some(512),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn missing_repository_is_reported() {
        let provider = Arc::new(MockProvider::with_responses(vec!["4".into()]));
        let git = Arc::new(GitRepository::new());
        let mut ch = ScriptedChannel::new(&["/nonexistent/repo"]);

        workflow(&provider, &git)
            .run(&mut ch, "notes for the last 4 commits")
            .await
            .unwrap();

        assert_eq!(ch.sent[0], REPOSITORY_PROMPT);
        assert_eq!(
            ch.sent[1],
            "Error processing your query: repository path does not exist: /nonexistent/repo"
        );
        assert_eq!(
            git.repository_path().await.as_deref(),
            Some(std::path::Path::new("/nonexistent/repo"))
        );
    }

    #[tokio::test]
    async fn eof_at_repository_prompt_returns_quietly() {
        let provider = Arc::new(MockProvider::default());
        let git = Arc::new(GitRepository::new());
        let mut ch = ScriptedChannel::new(&[]);

        workflow(&provider, &git).run(&mut ch, "commits").await.unwrap();

        assert_eq!(ch.sent, vec![REPOSITORY_PROMPT]);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn generates_notes_for_real_repository() {
        let git_ok = tokio::process::Command::new("git")
            .arg("--version")
            .output()
            .await
            .is_ok_and(|o| o.status.success());
        if !git_ok {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Ada"],
            vec!["config", "user.email", "ada@example.com"],
            vec!["config", "commit.gpgsign", "false"],
            vec!["commit", "-q", "--allow-empty", "-m", "Add parser"],
            vec!["commit", "-q", "--allow-empty", "-m", "Fix crash"],
        ] {
            let status = tokio::process::Command::new("git")
                .arg("-C")
                .arg(path)
                .args(&args)
                .status()
                .await
                .unwrap();
            assert!(status.success());
        }

        let provider = Arc::new(MockProvider::with_responses(vec![
            "1".into(),
            "- Fixed a crash".into(),
        ]));
        let git = Arc::new(GitRepository::new());
        let mut ch = ScriptedChannel::new(&[path.to_str().unwrap()]);

        workflow(&provider, &git)
            .run(&mut ch, "release notes for the last commit")
            .await
            .unwrap();

        assert_eq!(ch.sent[1], "Release Notes:\n- Fixed a crash");
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let user = &requests[1].messages[1].content;
        assert!(user.contains("- Fix crash (Ada, "));
        assert!(!user.contains("Add parser"));
    }
}
