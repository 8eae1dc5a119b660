//! Test-only mock LLM provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_stream::StreamExt;

use crate::provider::{
    ChatOptions, ChatResponse, ChatStream, LlmProvider, Message, ToolDefinition,
};

/// One captured call, for assertions on what the caller sent.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub options: ChatOptions,
    pub tool_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    tool_responses: Arc<Mutex<Vec<ChatResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    pub supports_embeddings: bool,
    /// When set, `embed` returns a bag-of-words hash vector of this dimension.
    pub hashed_embedding_dim: Option<usize>,
    /// Embedding calls with an index at or past this value fail.
    pub fail_embed_after: Option<usize>,
    pub streaming: bool,
    /// When set, `chat_stream` yields the whole reply as one chunk and then never ends.
    pub stall_stream: bool,
    pub tool_use: bool,
    pub fail_chat: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            tool_responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            embedding: vec![0.0; 384],
            supports_embeddings: false,
            hashed_embedding_dim: None,
            fail_embed_after: None,
            streaming: false,
            stall_stream: false,
            tool_use: false,
            fail_chat: false,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    #[must_use]
    pub fn with_stalled_stream(mut self) -> Self {
        self.stall_stream = true;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Enable deterministic text embeddings so similar words land near each other.
    #[must_use]
    pub fn with_hashed_embeddings(mut self, dim: usize) -> Self {
        self.supports_embeddings = true;
        self.hashed_embedding_dim = Some(dim);
        self
    }

    #[must_use]
    pub fn with_embed_failure_after(mut self, calls: usize) -> Self {
        self.fail_embed_after = Some(calls);
        self
    }

    /// Queue tool-loop replies. Once drained, `chat_with_tools` falls back to text responses.
    #[must_use]
    pub fn with_tool_responses(mut self, responses: Vec<ChatResponse>) -> Self {
        self.tool_use = true;
        self.tool_responses = Arc::new(Mutex::new(responses));
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    fn record(&self, messages: &[Message], options: ChatOptions, tools: &[ToolDefinition]) {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            options,
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
    }

    async fn next_response(&self) -> Result<String, crate::LlmError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}

/// Hash each lowercase word into a bucket and L2-normalize the counts.
fn hashed_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0_f32; dim.max(1)];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        let bucket = usize::try_from(hash % vector.len() as u64).unwrap_or(0);
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector[0] = 1.0;
    } else {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

impl LlmProvider for MockProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        self.record(messages, ChatOptions::default(), &[]);
        self.next_response().await
    }

    async fn chat_with_options(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<String, crate::LlmError> {
        self.record(messages, *options, &[]);
        self.next_response().await
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, crate::LlmError> {
        let response = self.chat(messages).await?;
        if self.stall_stream {
            let first = tokio_stream::once(Ok::<_, crate::LlmError>(response));
            return Ok(Box::pin(first.chain(tokio_stream::pending())));
        }
        let chunks: Vec<_> = response.chars().map(|c| c.to_string()).map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if !self.supports_embeddings {
            return Err(crate::LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed_after.is_some_and(|n| call >= n) {
            return Err(crate::LlmError::Other("mock embedding error".into()));
        }
        Ok(match self.hashed_embedding_dim {
            Some(dim) => hashed_embedding(text, dim),
            None => self.embedding.clone(),
        })
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn supports_tool_use(&self) -> bool {
        self.tool_use
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, crate::LlmError> {
        self.record(messages, ChatOptions::default(), tools);
        let queued = {
            let mut queue = self.tool_responses.lock().unwrap();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        };
        match queued {
            Some(response) => Ok(response),
            None => self.next_response().await.map(ChatResponse::Text),
        }
    }
}
