use std::sync::Arc;
use std::time::Duration;

use scribe_llm::{ChatResponse, LlmProvider, Message, MessagePart, Role, ToolUseRequest};
use tokio_stream::StreamExt;

use super::{Workflow, report};
use crate::channel::{Channel, is_exit_command};
use crate::error::WorkflowError;
use crate::history::ConversationHistory;
use crate::tools::{ChatTool, ToolRunner};

const CHAT_PROMPT: &str = "You >";

/// Free-form conversation with optional native tool use.
pub struct ChatWorkflow<P: LlmProvider> {
    provider: Arc<P>,
    tools: Arc<ToolRunner<P>>,
    history: ConversationHistory,
    max_tool_iterations: usize,
    timeout: Duration,
}

impl<P: LlmProvider> ChatWorkflow<P> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        tools: Arc<ToolRunner<P>>,
        max_tool_iterations: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            tools,
            history: ConversationHistory::new(),
            max_tool_iterations,
            timeout,
        }
    }

    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    fn timed_out(&self, operation: &'static str) -> WorkflowError {
        WorkflowError::Timeout {
            operation,
            seconds: self.timeout.as_secs(),
        }
    }

    async fn turn<C: Channel>(&mut self, channel: &mut C, input: &str) -> Result<(), WorkflowError> {
        self.history.push_user(input);

        if self.provider.supports_tool_use() {
            return self.tool_loop(channel).await;
        }

        let reply = if self.provider.supports_streaming() {
            self.stream_reply(channel).await?
        } else {
            let reply = tokio::time::timeout(self.timeout, self.provider.chat(self.history.messages()))
                .await
                .map_err(|_| self.timed_out("chat completion"))??;
            channel.send(&reply).await?;
            reply
        };
        self.history.push_assistant(reply);
        Ok(())
    }

    /// Open and drain the stream under one deadline. Chunks already shown stay shown.
    async fn stream_reply<C: Channel>(&self, channel: &mut C) -> Result<String, WorkflowError> {
        let result = tokio::time::timeout(self.timeout, self.drain_stream(channel)).await;
        channel.flush_chunks().await?;
        result.map_err(|_| self.timed_out("chat stream"))?
    }

    async fn drain_stream<C: Channel>(&self, channel: &mut C) -> Result<String, WorkflowError> {
        let mut stream = self.provider.chat_stream(self.history.messages()).await?;
        let mut response = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            response.push_str(&chunk);
            channel.send_chunk(&chunk).await?;
        }
        Ok(response)
    }

    async fn tool_loop<C: Channel>(&mut self, channel: &mut C) -> Result<(), WorkflowError> {
        let definitions = ChatTool::definitions();

        for iteration in 0..self.max_tool_iterations {
            let response = tokio::time::timeout(
                self.timeout,
                self.provider
                    .chat_with_tools(self.history.messages(), &definitions),
            )
            .await
            .map_err(|_| self.timed_out("chat completion"))??;

            match response {
                ChatResponse::Text(text) => {
                    if !text.is_empty() {
                        channel.send(&text).await?;
                    }
                    self.history.push_assistant(text);
                    return Ok(());
                }
                ChatResponse::ToolUse { text, tool_calls } => {
                    tracing::debug!(iteration, calls = tool_calls.len(), "tool use requested");
                    if let Some(t) = text.as_deref()
                        && !t.is_empty()
                    {
                        channel.send(t).await?;
                    }
                    self.run_tools(text, &tool_calls).await;
                }
            }
        }

        tracing::warn!(
            limit = self.max_tool_iterations,
            "stopping tool loop: iteration limit reached"
        );
        channel
            .send("Stopping: reached the tool call limit for this turn.")
            .await?;
        Ok(())
    }

    async fn run_tools(&mut self, text: Option<String>, tool_calls: &[ToolUseRequest]) {
        let mut parts: Vec<MessagePart> = Vec::new();
        if let Some(t) = text
            && !t.is_empty()
        {
            parts.push(MessagePart::Text { text: t });
        }
        for tc in tool_calls {
            parts.push(MessagePart::ToolUse {
                id: tc.id.clone(),
                name: tc.name.clone(),
                input: tc.input.clone(),
            });
        }
        self.history.push(Message::from_parts(Role::Assistant, parts));

        let mut results = Vec::with_capacity(tool_calls.len());
        for tc in tool_calls {
            let output = self.tools.run(tc).await;
            results.push(MessagePart::ToolResult {
                tool_use_id: tc.id.clone(),
                content: output,
            });
        }
        self.history.push(Message::from_parts(Role::User, results));
    }
}

impl<P: LlmProvider> Workflow for ChatWorkflow<P> {
    async fn run<C: Channel>(&mut self, channel: &mut C, input: &str) -> Result<(), WorkflowError> {
        let result = self.turn(channel, input).await;
        report(channel, result).await?;

        loop {
            let Some(line) = channel.prompt(CHAT_PROMPT).await? else {
                return Ok(());
            };
            let line = line.trim();
            if is_exit_command(line) {
                return Ok(());
            }
            if line.is_empty() {
                continue;
            }
            let result = self.turn(channel, line).await;
            report(channel, result).await?;
        }
    }
}
