//! Request/response types for the completion capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use concierge_types::GatewayError;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// Guest input
    User,
    /// Model response
    Assistant,
    /// Result of a tool call, answering an assistant tool request
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls issued by an assistant message, echoed back to the
    /// provider when continuing a tool loop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For [`Role::Tool`] messages, the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool calls.
    #[must_use]
    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool-result message answering the given call id.
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Declaration of a tool the model may request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool input object.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model.
///
/// `arguments` is the provider's raw JSON text. It is parsed at dispatch
/// time so unparseable arguments become a recoverable tool failure rather
/// than a gateway error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed on the tool-result message.
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Input to a completion backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model to use; empty selects the backend default.
    pub model: String,
    /// Deadline for this call.
    pub timeout: Duration,
    /// Ordered conversation messages.
    pub messages: Vec<Message>,
    /// Tools offered to the model for this call.
    pub tools: Vec<ToolSpec>,
    /// Sampling temperature; `None` uses the backend default.
    pub temperature: Option<f32>,
    /// Completion token cap; `None` uses the backend default.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            timeout,
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Result from a completion backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Final text, if the model produced one.
    pub content: Option<String>,
    /// Tool calls requested by the model, in emission order.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Provider name (e.g. "openai", "scripted").
    pub provider: String,
    /// Model that actually served the call.
    pub model_used: String,
    /// Input tokens consumed, when the provider reports usage.
    pub tokens_input: Option<u64>,
    /// Output tokens generated, when the provider reports usage.
    pub tokens_output: Option<u64>,
}

impl CompletionResponse {
    #[must_use]
    pub fn new(provider: impl Into<String>, model_used: impl Into<String>) -> Self {
        Self {
            content: None,
            tool_calls: Vec::new(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    /// Whether the model requested any tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, or empty when the model emitted only tool calls.
    #[must_use]
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Trait for completion backend implementations.
///
/// All providers implement this trait, allowing the orchestrator to work
/// with any provider without knowing implementation details.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request one completion.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` for any failure during the call, including
    /// transport failures, provider errors (auth, quota, outages), timeouts,
    /// and malformed provider responses.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError>;
}
