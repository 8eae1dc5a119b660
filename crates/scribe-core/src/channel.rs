/// Typed error for channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel closed (reader task gone or receiver dropped).
    #[error("channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

/// Incoming message from a channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub text: String,
}

/// Bidirectional text surface between the operator and the workflows.
pub trait Channel: Send {
    /// Receive the next message. Returns `None` on EOF or shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn recv(&mut self)
    -> impl Future<Output = Result<Option<ChannelMessage>, ChannelError>> + Send;

    /// Send a text response.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Send a partial chunk of streaming response.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send_chunk(&mut self, chunk: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Flush any buffered chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn flush_chunks(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Show `label` and wait for one line of input. Returns `None` on EOF.
    ///
    /// The default sends the label as a regular message; interactive channels
    /// render it inline.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn prompt(
        &mut self,
        label: &str,
    ) -> impl Future<Output = Result<Option<String>, ChannelError>> + Send {
        async move {
            self.send(label).await?;
            Ok(self.recv().await?.map(|m| m.text))
        }
    }
}

/// `true` for the words that end a session or a workflow loop.
#[must_use]
pub fn is_exit_command(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    struct StubChannel {
        inputs: VecDeque<String>,
        sent: Vec<String>,
    }

    impl Channel for StubChannel {
        async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
            Ok(self.inputs.pop_front().map(|text| ChannelMessage { text }))
        }

        async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
            self.sent.push(text.to_owned());
            Ok(())
        }

        async fn send_chunk(&mut self, _chunk: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn flush_chunks(&mut self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_prompt_sends_label_then_reads() {
        let mut ch = StubChannel {
            inputs: VecDeque::from(["./repo".to_owned()]),
            ..StubChannel::default()
        };
        let answer = ch.prompt("Path:").await.unwrap();
        assert_eq!(answer.as_deref(), Some("./repo"));
        assert_eq!(ch.sent, vec!["Path:"]);
    }

    #[tokio::test]
    async fn prompt_returns_none_on_eof() {
        let mut ch = StubChannel::default();
        assert!(ch.prompt("Path:").await.unwrap().is_none());
    }

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  QUIT \n"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn channel_error_display() {
        assert_eq!(ChannelError::ChannelClosed.to_string(), "channel closed");
        assert_eq!(ChannelError::Other("boom".into()).to_string(), "boom");
    }
}
