//! OpenAI-compatible HTTP backend.
//!
//! Speaks the chat-completions wire format with function calling, so any
//! provider exposing that surface works through a `base_url` override.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use concierge_config::GatewaySettings;
use concierge_types::GatewayError;

use crate::http_client::HttpClient;
use crate::types::{
    CompletionBackend, CompletionRequest, CompletionResponse, Message, Role, ToolCallRequest,
    ToolSpec,
};

/// Default chat-completions endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub(crate) struct OpenAiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

/// HTTP request parameters
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl OpenAiBackend {
    /// Create a new backend.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Misconfiguration` if the HTTP client cannot be
    /// constructed.
    pub(crate) fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, GatewayError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Create a new backend from gateway settings.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Misconfiguration` if:
    /// - The API key environment variable is not set
    /// - No default model is configured
    /// - The HTTP client cannot be constructed
    pub(crate) fn new_from_settings(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            GatewayError::Misconfiguration(format!(
                "API key not found in environment variable '{}'. \
                 Please set this variable or configure a different api_key_env in [gateway].",
                settings.api_key_env
            ))
        })?;

        if settings.model.is_empty() {
            return Err(GatewayError::Misconfiguration(
                "No model specified in configuration. Please set [gateway] model = \"model-name\"."
                    .to_string(),
            ));
        }

        let default_params = HttpParams {
            max_tokens: settings.max_tokens,
            ..HttpParams::default()
        };

        Self::new(
            api_key,
            settings.base_url.clone(),
            settings.model.clone(),
            default_params,
        )
    }

    /// Resolve parameters for this request.
    ///
    /// `request.model`, `request.max_tokens`, and `request.temperature`
    /// override the backend defaults; unset values fall back.
    fn resolve_params(&self, request: &CompletionRequest) -> (String, HttpParams) {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let params = HttpParams {
            max_tokens: request.max_tokens.unwrap_or(self.default_params.max_tokens),
            temperature: request
                .temperature
                .unwrap_or(self.default_params.temperature),
        };

        (model, params)
    }

    /// Convert messages to the chat-completions wire format.
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|msg| {
                // An assistant turn that only carries tool calls has null
                // content on the wire.
                let content = if msg.role == Role::Assistant
                    && msg.content.is_empty()
                    && !msg.tool_calls.is_empty()
                {
                    None
                } else {
                    Some(msg.content.clone())
                };

                WireMessage {
                    role: msg.role.as_str().to_string(),
                    content,
                    tool_call_id: msg.tool_call_id.clone(),
                    tool_calls: msg.tool_calls.iter().map(WireToolCall::from_call).collect(),
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|tool| WireTool {
                kind: "function".to_string(),
                function: WireFunctionDef {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        let (model, params) = self.resolve_params(&request);

        debug!(
            provider = "openai",
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            tools = request.tools.len(),
            timeout_secs = request.timeout.as_secs(),
            "Invoking completion backend"
        );

        let body = WireRequest {
            model: model.clone(),
            messages: Self::convert_messages(&request.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
            tools: Self::convert_tools(&request.tools),
        };

        let http_request = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(http_request, request.timeout, "openai")
            .await?;

        let response_body: WireResponse = response.json().await.map_err(|e| {
            GatewayError::MalformedResponse(format!("failed to parse provider response: {e}"))
        })?;

        let choice = response_body.choices.into_iter().next().ok_or_else(|| {
            GatewayError::MalformedResponse("provider response missing choices[0]".to_string())
        })?;

        let tool_calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .into_iter()
            .map(WireToolCall::into_call)
            .collect();

        if choice.message.content.is_none() && tool_calls.is_empty() {
            return Err(GatewayError::MalformedResponse(
                "provider response has neither content nor tool calls".to_string(),
            ));
        }

        let mut result = CompletionResponse::new(
            "openai",
            response_body.model.unwrap_or_else(|| model.clone()),
        )
        .with_tool_calls(tool_calls);
        result.content = choice.message.content;

        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = "openai",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            tool_calls = result.tool_calls.len(),
            "Completion received"
        );

        Ok(result)
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

/// Wire message, shared between request and response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionDef,
}

#[derive(Debug, Clone, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

impl WireToolCall {
    fn from_call(call: &ToolCallRequest) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function".to_string(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }

    fn into_call(self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id,
            name: self.function.name,
            arguments: self.function.arguments,
        }
    }
}

/// Function payload; `arguments` is JSON-encoded text per the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

/// Chat-completions response body.
#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_backend(default_params: HttpParams) -> OpenAiBackend {
        OpenAiBackend::new(
            "test-key".to_string(),
            None,
            "default-model".to_string(),
            default_params,
        )
        .unwrap()
    }

    #[test]
    fn resolve_params_uses_defaults() {
        let backend = test_backend(HttpParams {
            max_tokens: 1024,
            temperature: 0.5,
        });

        let request = CompletionRequest::new("", Duration::from_secs(30), vec![]);
        let (model, params) = backend.resolve_params(&request);

        assert_eq!(model, "default-model");
        assert_eq!(params.max_tokens, 1024);
        assert_eq!(params.temperature, 0.5);
    }

    #[test]
    fn resolve_params_honors_request_overrides() {
        let backend = test_backend(HttpParams {
            max_tokens: 1024,
            temperature: 0.5,
        });

        let request = CompletionRequest::new("custom-model", Duration::from_secs(30), vec![])
            .with_temperature(0.0)
            .with_max_tokens(256);
        let (model, params) = backend.resolve_params(&request);

        assert_eq!(model, "custom-model");
        assert_eq!(params.max_tokens, 256);
        assert_eq!(params.temperature, 0.0);
    }

    #[test]
    fn convert_messages_maps_roles_and_tool_results() {
        let messages = vec![
            Message::system("You are the front desk."),
            Message::user("What's my bill?"),
            Message::assistant_with_calls(
                "",
                vec![ToolCallRequest::new("call_1", "get_bill", "{\"booking_id\":\"BK-1001\"}")],
            ),
            Message::tool_result("call_1", "{\"total\": 876.0}"),
        ];

        let wire = OpenAiBackend::convert_messages(&messages);

        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");

        // Tool-only assistant turn serializes with null content.
        assert_eq!(wire[2].role, "assistant");
        assert_eq!(wire[2].content, None);
        assert_eq!(wire[2].tool_calls.len(), 1);
        assert_eq!(wire[2].tool_calls[0].function.name, "get_bill");

        assert_eq!(wire[3].role, "tool");
        assert_eq!(wire[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire[3].content.as_deref(), Some("{\"total\": 876.0}"));
    }

    #[test]
    fn tools_are_omitted_from_wire_body_when_empty() {
        let body = WireRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: 16,
            temperature: 0.0,
            stream: false,
            tools: vec![],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("\"tools\""), "got: {json}");
    }

    #[test]
    fn response_tool_calls_round_trip() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "check_availability", "arguments": "{\"room_type\":\"deluxe\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18}
        }"#;

        let parsed: WireResponse = serde_json::from_str(raw).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        let call = choice.message.tool_calls.into_iter().next().unwrap().into_call();

        assert_eq!(call.id, "call_9");
        assert_eq!(call.name, "check_availability");
        assert!(call.arguments.contains("deluxe"));
    }
}
