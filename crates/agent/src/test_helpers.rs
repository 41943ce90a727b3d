//! Shared test helpers for agent loop tests.

use async_trait::async_trait;
use dvagent_core::credential::Credential;
use dvagent_core::error::{BackendError, ProviderError, ToolError};
use dvagent_core::message::{Message, MessageToolCall};
use dvagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use dvagent_core::tool::{Tool, ToolContext, ToolRegistry, ToolResult};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::loop_runner::AgentRequest;

/// A mock provider that returns a sequence of scripted responses and
/// records every request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    fn scripted(script: VecDeque<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that returns a single text response (no tool calls).
    pub fn text(text: &str) -> Self {
        Self::new(vec![text_response(text)])
    }

    /// A provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_call_response(tool_calls), text_response(answer)])
    }

    /// A provider whose first call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(VecDeque::from([Err(error)]))
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no response left for call #{call}"))
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: Some("stop".into()),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A response that only requests tools.
pub fn tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(None, tool_calls),
        finish_reason: Some("tool_calls".into()),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

pub fn user_request(text: &str) -> AgentRequest {
    AgentRequest {
        messages: vec![Message::user(text)],
        model: "mock-model".into(),
        temperature: 0.7,
        max_tokens: 2048,
        credential: Credential::new("test-token"),
    }
}

/// Echoes its `text` argument.
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let text = arguments.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(ToolResult::ok(json!({ "echo": text })))
    }
}

/// Always fails with a backend error.
struct FailTool;

#[async_trait]
impl Tool for FailTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        Err(BackendError::NotFound("Table 'ghost' not found".into()).into())
    }
}

/// Panics inside the handler.
struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn name(&self) -> &str {
        "panic"
    }

    fn description(&self) -> &str {
        "Panics"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        panic!("handler exploded");
    }
}

pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(EchoTool));
    registry.register(Box::new(FailTool));
    registry.register(Box::new(PanicTool));
    registry
}
