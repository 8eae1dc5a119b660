use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{
    ChatOptions, ChatResponse, ChatStream, LlmProvider, Message, MessagePart, Role,
    ToolDefinition, ToolUseRequest,
};
use crate::sse::openai_sse_to_stream;

/// Provider for the OpenAI chat completions API and any server that speaks it.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    embedding_model: Option<String>,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: Option<String>,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            embedding_model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn send_request(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            temperature: options.temperature,
            stream: false,
        };

        let response = self.post("chat/completions").json(&body).send().await?;
        let text = check_status(response, "chat").await?;
        let resp: ChatCompletion = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse {
                provider: "openai".into(),
            })
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<String, LlmError> {
    let status = response.status();
    let text = response.text().await.map_err(LlmError::Http)?;

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
        tracing::error!(status = status.as_u16(), "OpenAI {what} request error: {text}");
        return Err(LlmError::Api {
            provider: "openai".into(),
            status: status.as_u16(),
        });
    }

    Ok(text)
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.send_request(messages, &ChatOptions::default()).await
    }

    async fn chat_with_options(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<String, LlmError> {
        self.send_request(messages, options).await
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            temperature: None,
            stream: true,
        };

        let response = self.post("chat/completions").json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let text = response.text().await.map_err(LlmError::Http)?;
            tracing::error!(
                status = status.as_u16(),
                "OpenAI streaming request error: {text}"
            );
            return Err(LlmError::Api {
                provider: "openai".into(),
                status: status.as_u16(),
            });
        }

        Ok(openai_sse_to_stream(response))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::EmbedUnsupported {
                provider: "openai".into(),
            })?;

        let body = EmbeddingRequest { input: text, model };
        let response = self.post("embeddings").json(&body).send().await?;
        let text = check_status(response, "embedding").await?;
        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse {
                provider: "openai".into(),
            })
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    fn supports_tool_use(&self) -> bool {
        true
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        let api_messages = convert_messages_structured(messages);
        let api_tools: Vec<ApiTool> = tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function",
                function: ApiFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect();

        let body = ToolChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            tools: &api_tools,
        };

        let response = self.post("chat/completions").json(&body).send().await?;
        let text = check_status(response, "tool chat").await?;
        let resp: ToolChatResponse = serde_json::from_str(&text)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse {
                provider: "openai".into(),
            })?;

        Ok(into_chat_response(choice.message))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

fn into_chat_response(message: ToolChatMessage) -> ChatResponse {
    let content = message.content.unwrap_or_default();
    match message.tool_calls {
        Some(tool_calls) if !tool_calls.is_empty() => {
            let text = if content.is_empty() {
                None
            } else {
                Some(content)
            };
            let tool_calls = tool_calls
                .into_iter()
                .map(|tc| {
                    let input = serde_json::from_str(&tc.function.arguments)
                        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
                    ToolUseRequest {
                        id: tc.id,
                        name: tc.function.name,
                        input,
                    }
                })
                .collect();
            ChatResponse::ToolUse { text, tool_calls }
        }
        _ => ChatResponse::Text(content),
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: role_str(msg.role),
            content: msg.to_llm_content(),
        })
        .collect()
}

fn convert_messages_structured(messages: &[Message]) -> Vec<StructuredApiMessage> {
    let mut result = Vec::new();

    for msg in messages {
        if !msg.has_tool_parts() {
            result.push(StructuredApiMessage {
                role: role_str(msg.role).to_owned(),
                content: msg.to_llm_content().to_owned(),
                tool_calls: None,
                tool_call_id: None,
            });
            continue;
        }

        if msg.role == Role::Assistant {
            let text: String = msg
                .parts
                .iter()
                .filter_map(|p| match p {
                    MessagePart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            let tool_calls: Vec<ToolCallOut> = msg
                .parts
                .iter()
                .filter_map(|p| match p {
                    MessagePart::ToolUse { id, name, input } => Some(ToolCallOut {
                        id: id.clone(),
                        r#type: "function".to_owned(),
                        function: FunctionCallOut {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    }),
                    _ => None,
                })
                .collect();
            result.push(StructuredApiMessage {
                role: "assistant".to_owned(),
                content: text,
                tool_calls: Some(tool_calls).filter(|c| !c.is_empty()),
                tool_call_id: None,
            });
        } else {
            // tool results become role "tool" messages keyed by call id
            for part in &msg.parts {
                match part {
                    MessagePart::ToolResult {
                        tool_use_id,
                        content,
                    } => result.push(StructuredApiMessage {
                        role: "tool".to_owned(),
                        content: content.clone(),
                        tool_calls: None,
                        tool_call_id: Some(tool_use_id.clone()),
                    }),
                    MessagePart::Text { text } if !text.is_empty() => {
                        result.push(StructuredApiMessage {
                            role: "user".to_owned(),
                            content: text.clone(),
                            tool_calls: None,
                            tool_call_id: None,
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    result
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    r#type: &'a str,
    function: ApiFunction<'a>,
}

#[derive(Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Serialize)]
struct ToolChatRequest<'a> {
    model: &'a str,
    messages: &'a [StructuredApiMessage],
    max_tokens: u32,
    tools: &'a [ApiTool<'a>],
}

#[derive(Serialize)]
struct StructuredApiMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ToolCallOut {
    id: String,
    r#type: String,
    function: FunctionCallOut,
}

#[derive(Serialize)]
struct FunctionCallOut {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ToolChatResponse {
    choices: Vec<ToolChatChoice>,
}

#[derive(Deserialize)]
struct ToolChatChoice {
    message: ToolChatMessage,
}

#[derive(Deserialize)]
struct ToolChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    id: String,
    function: ToolCallFunction,
}

#[derive(Deserialize)]
struct ToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
