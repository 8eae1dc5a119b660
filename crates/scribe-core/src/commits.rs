//! How many commits a release-notes request asks for.

use std::time::Duration;

use scribe_llm::{ChatOptions, LlmProvider, Message};

use crate::config::{CommitsConfig, PromptTemplates};

/// Read a positive count from model output, capped at `max`.
///
/// Tries the whole trimmed reply first, then all of its digits run together.
#[must_use]
pub fn parse_commit_count(reply: &str, max: usize) -> Option<usize> {
    let reply = reply.trim();
    let count = reply.parse::<usize>().ok().filter(|n| *n > 0).or_else(|| {
        let digits: String = reply.chars().filter(char::is_ascii_digit).collect();
        digits.parse::<usize>().ok().filter(|n| *n > 0)
    })?;
    Some(count.min(max))
}

/// Ask the model for the commit count in `input`. Failures yield the configured default.
pub async fn extract_commit_count<P: LlmProvider>(
    provider: &P,
    templates: &PromptTemplates,
    input: &str,
    config: CommitsConfig,
    timeout: Duration,
) -> usize {
    let messages = [
        Message::system(templates.commit_count.clone()),
        Message::user(input),
    ];
    let options = ChatOptions::deterministic(10);

    let reply = match tokio::time::timeout(timeout, provider.chat_with_options(&messages, &options))
        .await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::warn!("commit count extraction failed: {e}");
            return config.default_count;
        }
        Err(_) => {
            tracing::warn!(
                seconds = timeout.as_secs(),
                "commit count extraction timed out"
            );
            return config.default_count;
        }
    };

    parse_commit_count(&reply, config.max_count).unwrap_or_else(|| {
        tracing::debug!(%reply, "no commit count in reply, using default");
        config.default_count
    })
}

#[cfg(test)]
mod tests {
    use scribe_llm::mock::MockProvider;

    use super::*;

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_commit_count("5", 20), Some(5));
        assert_eq!(parse_commit_count(" 12\n", 20), Some(12));
    }

    #[test]
    fn caps_at_max() {
        assert_eq!(parse_commit_count("100", 20), Some(20));
    }

    #[test]
    fn concatenates_digits_from_prose() {
        assert_eq!(parse_commit_count("The user wants 7 commits", 20), Some(7));
        assert_eq!(parse_commit_count("1 or 2", 20), Some(12));
    }

    #[test]
    fn rejects_zero_and_noise() {
        assert_eq!(parse_commit_count("0", 20), None);
        assert_eq!(parse_commit_count("none", 20), None);
        assert_eq!(parse_commit_count("", 20), None);
    }

    async fn extract(provider: &MockProvider) -> usize {
        extract_commit_count(
            provider,
            &PromptTemplates::default(),
            "last commits",
            CommitsConfig::default(),
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn extracts_from_model_reply() {
        let provider = MockProvider::with_responses(vec!["8".into()]);
        assert_eq!(extract(&provider).await, 8);
        let request = &provider.requests()[0];
        assert_eq!(request.options, ChatOptions::deterministic(10));
    }

    #[tokio::test]
    async fn unparseable_reply_uses_default() {
        let provider = MockProvider::with_responses(vec!["several".into()]);
        assert_eq!(extract(&provider).await, 3);
    }

    #[tokio::test]
    async fn provider_error_uses_default() {
        assert_eq!(extract(&MockProvider::failing()).await, 3);
    }

    #[tokio::test]
    async fn timeout_uses_default() {
        let provider = MockProvider::with_responses(vec!["9".into()]).with_delay(500);
        let count = extract_commit_count(
            &provider,
            &PromptTemplates::default(),
            "last 9 commits",
            CommitsConfig::default(),
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(count, 3);
    }
}
