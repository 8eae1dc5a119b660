//! The three workflows and the static registry that dispatches to them.

mod chat;
mod commits;
mod documentation;

pub use chat::ChatWorkflow;
pub use commits::CommitsWorkflow;
pub use documentation::{DocumentationSettings, DocumentationWorkflow};
pub(crate) use documentation::render_progress;

use scribe_llm::LlmProvider;

use crate::channel::Channel;
use crate::error::WorkflowError;
use crate::history::ConversationHistory;
use crate::router::Mode;

/// One mode's interaction loop. It runs until the operator leaves it.
pub trait Workflow: Send {
    /// Handle `input`, then keep serving the operator until the workflow exits.
    ///
    /// # Errors
    ///
    /// Only channel failures are returned; everything else is reported on the channel.
    fn run<C: Channel>(
        &mut self,
        channel: &mut C,
        input: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;
}

/// Send a failed turn's message to the operator. Channel errors are passed through.
pub(crate) async fn report<C: Channel>(
    channel: &mut C,
    result: Result<(), WorkflowError>,
) -> Result<(), WorkflowError> {
    match result {
        Ok(()) => Ok(()),
        Err(WorkflowError::Channel(e)) => Err(e.into()),
        Err(e) => {
            tracing::warn!("workflow turn failed: {e}");
            channel.send(&e.user_message()).await?;
            Ok(())
        }
    }
}

/// Exactly one handler per [`Mode`].
pub struct WorkflowRegistry<P: LlmProvider> {
    chat: ChatWorkflow<P>,
    commits: CommitsWorkflow<P>,
    documentation: DocumentationWorkflow<P>,
}

impl<P: LlmProvider> WorkflowRegistry<P> {
    #[must_use]
    pub fn new(
        chat: ChatWorkflow<P>,
        commits: CommitsWorkflow<P>,
        documentation: DocumentationWorkflow<P>,
    ) -> Self {
        Self {
            chat,
            commits,
            documentation,
        }
    }

    /// Run the workflow for `mode` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails.
    pub async fn dispatch<C: Channel>(
        &mut self,
        mode: Mode,
        channel: &mut C,
        input: &str,
    ) -> Result<(), WorkflowError> {
        tracing::info!(%mode, "entering workflow");
        match mode {
            Mode::Chat => self.chat.run(channel, input).await,
            Mode::Commits => self.commits.run(channel, input).await,
            Mode::Documentation => self.documentation.run(channel, input).await,
        }
    }

    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        self.chat.history()
    }
}
