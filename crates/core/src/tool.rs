//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the model act on the data store: list tables,
//! describe schemas, query and write records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use crate::error::{Error, ToolError};
use crate::provider::ToolDefinition;

/// A decoded request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution, serialized verbatim into the `tool`
/// message the model sees.
///
/// Payload fields are flattened next to `success`, so a listing serializes
/// as `{"success":true,"tables":[...],"count":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// Failure description when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Structured payload
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ToolResult {
    /// A successful result. Non-object payloads are stored under `"result"`.
    pub fn ok(data: serde_json::Value) -> Self {
        let data = match data {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("result".into(), other);
                map
            }
        };
        Self {
            success: true,
            error: None,
            data,
        }
    }

    /// A structured failure the model can read and react to.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: serde_json::Map::new(),
        }
    }

    /// Serialize to the JSON text carried by a `tool` message.
    pub fn to_content(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"unserializable tool result: {e}"}}"#))
    }
}

/// Ambient request information handed to every tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Trace the invocation is recorded under
    pub trace_id: String,

    /// The model's tool_call.id
    pub call_id: String,
}

/// The core Tool trait.
///
/// Each Dataverse operation implements this trait. Tools are registered in
/// the ToolRegistry and made available to the agent loop. Handlers never
/// touch conversation or trace state.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "list_tables").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name so requests are stable.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone(), ctx).await
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check that every declared definition has a handler and every handler
    /// is declared.
    pub fn validate_against(&self, declared: &[ToolDefinition]) -> crate::error::Result<()> {
        let names: Vec<&str> = declared.iter().map(|d| d.name.as_str()).collect();
        self.validate_names(&names)
    }

    /// Like [`validate_against`](Self::validate_against), for a list of names.
    pub fn validate_names(&self, declared: &[&str]) -> crate::error::Result<()> {
        let declared: BTreeSet<&str> = declared.iter().copied().collect();
        let registered: BTreeSet<&str> = self.tools.keys().map(|s| s.as_str()).collect();

        let missing: Vec<&str> = declared.difference(&registered).copied().collect();
        if !missing.is_empty() {
            return Err(Error::Config {
                message: format!("tool definitions without a handler: {}", missing.join(", ")),
            });
        }

        let undeclared: Vec<&str> = registered.difference(&declared).copied().collect();
        if !undeclared.is_empty() {
            return Err(Error::Config {
                message: format!("handlers without a tool definition: {}", undeclared.join(", ")),
            });
        }
        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("text is required".into()))?;
            Ok(ToolResult::ok(serde_json::json!({ "text": text, "call_id": ctx.call_id })))
        }
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn registry_executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let ctx = ToolContext { trace_id: "t1".into(), call_id: "call_1".into() };
        let result = registry
            .execute(&call("echo", serde_json::json!({"text": "hello"})), &ctx)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["text"], "hello");
        assert_eq!(result.data["call_id"], "call_1");
    }

    #[tokio::test]
    async fn registry_returns_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(&call("nonexistent", serde_json::json!({})), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");
    }

    #[tokio::test]
    async fn invalid_arguments_surface_as_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry
            .execute(&call("echo", serde_json::json!({})), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn result_serializes_flat() {
        let ok = ToolResult::ok(serde_json::json!({"count": 2}));
        let json: serde_json::Value = serde_json::from_str(&ok.to_content()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "count": 2}));

        let failed = ToolResult::failure("boom");
        let json: serde_json::Value = serde_json::from_str(&failed.to_content()).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn validation_detects_mismatch() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        assert!(registry.validate_against(&registry.definitions()).is_ok());

        let extra = ToolDefinition {
            name: "ghost".into(),
            description: String::new(),
            parameters: serde_json::json!({}),
        };
        let mut declared = registry.definitions();
        declared.push(extra);
        let err = registry.validate_against(&declared).unwrap_err();
        assert!(err.to_string().contains("ghost"));

        let err = registry.validate_against(&[]).unwrap_err();
        assert!(err.to_string().contains("echo"));
    }
}
