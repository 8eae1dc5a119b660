#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{
    ChatOptions, ChatResponse, ChatStream, LlmProvider, Message, ToolDefinition,
};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        delegate_provider!(self, |p| p.chat(messages).await)
    }

    async fn chat_with_options(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<String, crate::LlmError> {
        delegate_provider!(self, |p| p.chat_with_options(messages, options).await)
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, crate::LlmError> {
        delegate_provider!(self, |p| p.chat_stream(messages).await)
    }

    fn supports_streaming(&self) -> bool {
        delegate_provider!(self, |p| p.supports_streaming())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn supports_tool_use(&self) -> bool {
        delegate_provider!(self, |p| p.supports_tool_use())
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, crate::LlmError> {
        delegate_provider!(self, |p| p.chat_with_tools(messages, tools).await)
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegates_name_and_capabilities() {
        let ollama = AnyProvider::Ollama(OllamaProvider::new(
            "http://localhost:11434",
            "m".into(),
            "e".into(),
        ));
        assert_eq!(ollama.name(), "ollama");
        assert!(ollama.supports_embeddings());
        assert!(!ollama.supports_tool_use());

        let openai = AnyProvider::OpenAi(OpenAiProvider::new(
            "k".into(),
            "https://api.openai.com/v1".into(),
            "m".into(),
            100,
            None,
        ));
        assert_eq!(openai.name(), "openai");
        assert!(openai.supports_tool_use());
        assert!(!openai.supports_embeddings());
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn delegates_chat_to_mock() {
        let any = AnyProvider::Mock(MockProvider::with_responses(vec!["hi".into()]));
        assert_eq!(any.chat(&[Message::user("x")]).await.unwrap(), "hi");
    }
}
