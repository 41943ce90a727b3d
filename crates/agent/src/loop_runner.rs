//! The agent reasoning loop implementation.

use crate::error::AgentError;
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, load_system_prompt};
use dvagent_config::AgentConfig;
use dvagent_core::credential::Credential;
use dvagent_core::message::{Conversation, Message, MessageToolCall, Role};
use dvagent_core::provider::{Provider, ProviderRequest, ProviderResponse};
use dvagent_core::tool::{ToolCall, ToolContext, ToolRegistry, ToolResult};
use dvagent_telemetry::{SpanKind, SpanStatus, TraceStatus, TraceStore};
use futures::FutureExt;
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Returned instead of an answer when the iteration budget runs out.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I apologize, but I've reached the maximum number of processing steps. Please try rephrasing your question.";

/// TOOL span outputs keep at most this many characters of the result.
const TOOL_OUTPUT_PREVIEW: usize = 500;

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// One chat request as handed to the loop.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Caller messages, oldest first. Must be non-empty and contain no
    /// `tool` messages.
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Bearer credential for the model gateway
    pub credential: Credential,
}

impl AgentRequest {
    pub fn validate(&self) -> Result<(), AgentError> {
        validate_messages(&self.messages)
    }
}

/// Reject caller message lists that cannot seed a conversation: empty, or
/// carrying `tool` messages (those are produced only by the loop).
pub fn validate_messages(messages: &[Message]) -> Result<(), AgentError> {
    if messages.is_empty() {
        return Err(AgentError::InvalidRequest("messages must not be empty".into()));
    }
    if messages.iter().any(|m| m.role == Role::Tool) {
        return Err(AgentError::InvalidRequest(
            "tool messages cannot be supplied by the caller".into(),
        ));
    }
    Ok(())
}

/// The answer of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub response: String,
    /// Model calls made, 1-based
    pub iterations: usize,
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The model gateway
    provider: Arc<dyn Provider>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Where every run is recorded
    traces: Arc<TraceStore>,

    /// First message of every conversation
    system_prompt: String,

    /// Maximum model calls per run
    max_iterations: usize,
}

impl AgentLoop {
    /// Create a new agent loop with the built-in system prompt and a budget
    /// of 10 iterations.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, traces: Arc<TraceStore>) -> Self {
        Self {
            provider,
            tools,
            traces,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Apply the `[agent]` config section: budget and prompt file.
    pub fn with_config(self, config: &AgentConfig) -> Self {
        self.with_max_iterations(config.max_iterations)
            .with_system_prompt(load_system_prompt(config.system_prompt_file.as_deref()))
    }

    /// Set the maximum number of model calls per run (at least 1).
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn traces(&self) -> &Arc<TraceStore> {
        &self.traces
    }

    /// Open a trace for `request`, named after its latest user message.
    pub fn start_trace(&self, request: &AgentRequest) -> String {
        let user_message = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text())
            .unwrap_or_default();
        self.traces.create_trace(None, user_message)
    }

    /// Run one chat request to completion, recording it under `trace_id`.
    ///
    /// Returns the final answer, or the budget apology when the model keeps
    /// asking for tools. Only a gateway failure (or an invalid request) is
    /// an error; both mark the trace ERROR.
    pub async fn run(&self, trace_id: &str, request: AgentRequest) -> Result<AgentOutcome, AgentError> {
        if let Err(e) = request.validate() {
            self.traces.complete_trace(trace_id, TraceStatus::Error);
            return Err(e);
        }

        let AgentRequest {
            messages,
            model,
            temperature,
            max_tokens,
            credential,
        } = request;

        let mut conversation = Conversation::seeded(self.system_prompt.as_str(), messages);
        let user_question = conversation.last_user_text().unwrap_or_default().to_string();

        info!(
            trace_id,
            model = %model,
            messages = conversation.len(),
            "Processing conversation"
        );

        let agent_span = self.traces.add_span(
            trace_id,
            SpanKind::Agent,
            "Agent Chat",
            json!({ "user_question": user_question }),
            None,
        );

        let tool_definitions = self.tools.definitions();
        let llm_span_name = format!("llm/serving-endpoints/{model}/invocations");

        for iteration in 1..=self.max_iterations {
            debug!(trace_id, iteration, "Agent loop iteration");

            let llm_span = self.traces.add_span(
                trace_id,
                SpanKind::Llm,
                &llm_span_name,
                json!({ "iteration": iteration, "message_count": conversation.len() }),
                agent_span.as_deref(),
            );

            let provider_request = ProviderRequest {
                model: model.clone(),
                messages: conversation.messages.clone(),
                temperature,
                max_tokens,
                tools: tool_definitions.clone(),
                credential: credential.clone(),
            };

            let response = match self.provider.complete(provider_request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(trace_id, iteration, error = %e, "Model call failed");
                    let outputs = json!({ "error": e.to_string() });
                    self.end_span(trace_id, llm_span.as_deref(), outputs.clone(), SpanStatus::Error);
                    self.end_span(trace_id, agent_span.as_deref(), outputs, SpanStatus::Error);
                    self.traces.complete_trace(trace_id, TraceStatus::Error);
                    return Err(AgentError::Provider(e));
                }
            };

            self.end_span(trace_id, llm_span.as_deref(), response_summary(&response), SpanStatus::Ok);

            // No tool calls: this is the final text response
            if !response.has_tool_calls() {
                let answer = response.message.text().to_string();
                self.end_span(
                    trace_id,
                    agent_span.as_deref(),
                    json!({ "response": answer, "iterations": iteration }),
                    SpanStatus::Ok,
                );
                self.traces.complete_trace(trace_id, TraceStatus::Ok);
                info!(trace_id, iterations = iteration, "Agent finished");
                return Ok(AgentOutcome {
                    response: answer,
                    iterations: iteration,
                });
            }

            let Message {
                content, tool_calls, ..
            } = response.message;
            debug!(trace_id, tool_count = tool_calls.len(), "Executing tool calls");
            conversation.push(Message::assistant_tool_calls(content, tool_calls.clone()));

            for wire_call in &tool_calls {
                let call = decode_tool_call(wire_call);
                let tool_span = self.traces.add_span(
                    trace_id,
                    SpanKind::Tool,
                    &call.name,
                    call.arguments.clone(),
                    llm_span.as_deref(),
                );

                let ctx = ToolContext {
                    trace_id: trace_id.to_string(),
                    call_id: call.id.clone(),
                };
                let content = self.execute_tool(&call, &ctx).await.to_content();

                self.end_span(
                    trace_id,
                    tool_span.as_deref(),
                    json!({ "result": preview(&content, TOOL_OUTPUT_PREVIEW) }),
                    SpanStatus::Ok,
                );
                conversation.push(Message::tool_result(call.id, content));
            }
        }

        warn!(
            trace_id,
            iterations = self.max_iterations,
            "Max iterations reached, returning apology"
        );
        self.end_span(
            trace_id,
            agent_span.as_deref(),
            json!({
                "response": MAX_ITERATIONS_MESSAGE,
                "iterations": self.max_iterations,
                "status": "max_iterations",
            }),
            SpanStatus::Ok,
        );
        self.traces.complete_trace(trace_id, TraceStatus::Ok);

        Ok(AgentOutcome {
            response: MAX_ITERATIONS_MESSAGE.to_string(),
            iterations: self.max_iterations,
        })
    }

    /// Run one tool call. Handler errors and panics become structured
    /// failures the model can read.
    async fn execute_tool(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let start = std::time::Instant::now();
        let outcome = AssertUnwindSafe(self.tools.execute(call, ctx)).catch_unwind().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                debug!(tool = %call.name, success = result.success, duration_ms, "Tool executed");
                result
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, duration_ms, "Tool execution failed");
                ToolResult::failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!(tool = %call.name, reason = %reason, "Tool panicked");
                ToolResult::failure(format!("Tool '{}' panicked: {reason}", call.name))
            }
        }
    }

    fn end_span(&self, trace_id: &str, span_id: Option<&str>, outputs: Value, status: SpanStatus) {
        if let Some(span_id) = span_id {
            self.traces.complete_span(trace_id, span_id, outputs, status);
        }
    }
}

/// Decode wire arguments. Anything that is not a JSON object becomes `{}`.
fn decode_tool_call(call: &MessageToolCall) -> ToolCall {
    let arguments = match serde_json::from_str::<Value>(&call.arguments) {
        Ok(args @ Value::Object(_)) => args,
        Ok(other) => {
            warn!(tool = %call.name, arguments = %other, "Tool arguments are not an object, using {{}}");
            json!({})
        }
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Could not decode tool arguments, using {{}}");
            json!({})
        }
    };
    ToolCall {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments,
    }
}

fn response_summary(response: &ProviderResponse) -> Value {
    let mut summary = json!({
        "finish_reason": response.finish_reason,
        "has_content": !response.message.text().is_empty(),
        "tool_call_count": response.message.tool_calls.len(),
    });
    if let Some(usage) = response.usage {
        summary["usage"] = json!(usage);
    }
    summary
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
