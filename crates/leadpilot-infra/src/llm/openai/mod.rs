//! OpenAiProvider -- [`LlmProvider`] for any OpenAI-compatible Chat
//! Completions endpoint, built on [`async_openai`].
//!
//! Streaming chunks are mapped one to one onto [`StreamEvent`]s; tool-call
//! fragments are passed through untouched for the orchestrator to
//! reassemble.

pub mod streaming;

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionResponseMessage,
    ChatCompletionStreamOptions, CreateChatCompletionRequest,
};
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use leadpilot_core::llm::provider::{LlmProvider, ProviderStream};
use leadpilot_types::config::LlmConfig;
use leadpilot_types::llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, MessageRole, ToolCall, Usage,
};

use self::streaming::{map_chunk, map_finish_reason};

/// OpenAI-compatible chat provider.
///
/// Does not derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let mut openai_config =
            OpenAIConfig::new().with_api_base(config.base_url.trim_end_matches('/'));
        if let Some(key) = &config.api_key {
            openai_config = openai_config.with_api_key(key.expose_secret());
        }

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
            model: config.model.clone(),
        })
    }

    /// Translate a [`CompletionRequest`] into the Chat Completions request.
    ///
    /// History `tool` turns carry no call id, so they go out as system notes.
    fn build_request(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(system_message(system));
        }
        for msg in &request.messages {
            messages.push(match msg.role {
                MessageRole::System | MessageRole::Tool => system_message(&msg.content),
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            });
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if !request.tools.is_empty() {
            // Tool schemas are JSON already; parse them straight into the
            // request's tool type.
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            req.tools = Some(serde_json::from_value(Value::Array(tools)).map_err(|e| {
                LlmError::InvalidRequest(format!("invalid tool definition: {e}"))
            })?);
            req.tool_choice = Some(serde_json::from_value(json!("auto")).map_err(|e| {
                LlmError::InvalidRequest(format!("invalid tool choice: {e}"))
            })?);
        }

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        Ok(req)
    }
}

fn system_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
        name: None,
    })
}

/// Pull complete function calls out of a response message.
///
/// Read through the serialized form so custom (non-function) tool calls are
/// skipped rather than failing the round.
fn tool_calls_of(message: &ChatCompletionResponseMessage) -> Vec<ToolCall> {
    let Ok(Value::Array(calls)) = serde_json::to_value(&message.tool_calls) else {
        return Vec::new();
    };
    calls
        .iter()
        .filter_map(|call| {
            let function = call.get("function")?;
            Some(ToolCall {
                id: call.get("id")?.as_str()?.to_string(),
                name: function.get("name")?.as_str()?.to_string(),
                arguments: function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request, false)?;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::Deserialization("completion has no choices".to_string()))?;

        let tool_calls = tool_calls_of(&choice.message);
        let finish_reason = match &choice.finish_reason {
            Some(reason) => map_finish_reason(reason),
            None if !tool_calls.is_empty() => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };

        let usage = response
            .usage
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id.clone(),
            content: choice.message.content.clone().unwrap_or_default(),
            model: response.model.clone(),
            tool_calls,
            finish_reason,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> ProviderStream {
        let oai_request = match self.build_request(&request, true) {
            Ok(req) => req,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let mut chunks = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(map_openai_error)?;
                for event in map_chunk(&chunk) {
                    yield event;
                }
            }
            debug!("provider stream done");
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else if error_type == "invalid_request_error" {
                LlmError::InvalidRequest(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401 | 403) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(500..=599) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}
