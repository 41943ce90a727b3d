//! Provider trait: the abstraction over the model gateway.
//!
//! A Provider knows how to send a conversation plus tool schemas to a
//! foundation-model endpoint and get back either a final message or a list
//! of requested tool invocations.
//!
//! Only the OpenAI-style tool-calling envelope is modeled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::credential::Credential;
use crate::error::ProviderError;
use crate::message::Message;

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The model or serving endpoint name (e.g., "databricks-claude-sonnet-4")
    pub model: String,

    /// The full conversation, system message first
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Available tools the model can call
    pub tools: Vec<ToolDefinition>,

    /// Bearer credential for the gateway
    pub credential: Credential,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// The OpenAI function envelope: `{"type":"function","function":{...}}`.
    pub fn to_function_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// The first choice of a completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message (content and/or tool calls)
    pub message: Message,

    /// Why generation stopped ("stop", "tool_calls", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which endpoint style is
/// behind it, so tests can swap in a scripted provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "databricks").
    fn name(&self) -> &str;

    /// Send a request and get the first choice back.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}
