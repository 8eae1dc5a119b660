use crate::channel::ChannelError;
use crate::git::GitError;

/// Errors surfaced by a workflow turn.
///
/// Everything except [`WorkflowError::Channel`] is rendered to the operator and the
/// workflow keeps running. A channel failure ends the session.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Index(#[from] scribe_index::IndexError),

    #[error(transparent)]
    Llm(#[from] scribe_llm::LlmError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

impl WorkflowError {
    /// Text shown to the operator when a turn fails.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Error processing your query: {self}")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn user_message_wraps_display() {
        let err = WorkflowError::Index(scribe_index::IndexError::NotFound {
            path: PathBuf::from("./missing"),
        });
        assert_eq!(
            err.user_message(),
            "Error processing your query: directory not found: ./missing"
        );
    }

    #[test]
    fn timeout_display() {
        let err = WorkflowError::Timeout {
            operation: "chat completion",
            seconds: 5,
        };
        assert_eq!(err.to_string(), "chat completion timed out after 5s");
    }
}
