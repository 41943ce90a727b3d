//! Data model for execution traces and their spans.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of generated span ids.
pub const SPAN_ID_LEN: usize = 12;

/// Characters of the user message kept in a [`TraceSummary`].
pub const PREVIEW_LEN: usize = 100;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// ── Span ──────────────────────────────────────────────────────────────────

/// The kind of work a span represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    /// Top-level chat request (user question → final answer).
    Agent,
    /// One model gateway call.
    Llm,
    /// One tool execution.
    Tool,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent => write!(f, "AGENT"),
            Self::Llm => write!(f, "LLM"),
            Self::Tool => write!(f, "TOOL"),
        }
    }
}

/// Lifecycle of a span. Created `Running`, moves once to `Ok` or `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanStatus {
    Running,
    Ok,
    Error,
}

/// A single traced execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Identifier, unique within its trace.
    pub span_id: String,
    /// What kind of work this represents.
    pub span_type: SpanKind,
    /// Human-readable label (e.g. tool name, endpoint path).
    pub name: String,
    /// Parent span id (None for the AGENT span).
    pub parent_id: Option<String>,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub status: SpanStatus,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
}

impl Span {
    /// Create a running span with the given kind and name.
    pub fn new(kind: SpanKind, name: impl Into<String>, inputs: serde_json::Value) -> Self {
        Self {
            span_id: short_id(),
            span_type: kind,
            name: name.into(),
            parent_id: None,
            start_time_ms: now_ms(),
            end_time_ms: None,
            duration_ms: None,
            status: SpanStatus::Running,
            inputs,
            outputs: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the parent span.
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn is_running(&self) -> bool {
        self.status == SpanStatus::Running
    }

    /// Mark the span as ended. Returns `false` if it had already ended.
    pub fn end(&mut self, outputs: serde_json::Value, status: SpanStatus) -> bool {
        if !self.is_running() {
            return false;
        }
        let now = now_ms();
        self.end_time_ms = Some(now);
        self.duration_ms = Some((now - self.start_time_ms).max(0));
        self.outputs = outputs;
        self.status = status;
        true
    }
}

/// A fresh 12-character hex id.
pub(crate) fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SPAN_ID_LEN);
    id
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// Overall outcome of a chat request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    InProgress,
    Ok,
    Error,
}

/// What the caller asked, recorded when the trace is opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub user_message: String,
}

/// The spans recorded for one top-level chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    pub request_metadata: RequestMetadata,
    /// Creation time in epoch milliseconds.
    pub timestamp_ms: i64,
    pub status: TraceStatus,
    pub execution_time_ms: Option<i64>,
    /// Spans in creation order.
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(trace_id: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            request_metadata: RequestMetadata {
                user_message: user_message.into(),
            },
            timestamp_ms: now_ms(),
            status: TraceStatus::InProgress,
            execution_time_ms: None,
            spans: Vec::new(),
        }
    }

    pub fn span(&self, span_id: &str) -> Option<&Span> {
        self.spans.iter().find(|s| s.span_id == span_id)
    }

    pub fn span_mut(&mut self, span_id: &str) -> Option<&mut Span> {
        self.spans.iter_mut().find(|s| s.span_id == span_id)
    }

    /// Spans of one kind, in creation order.
    pub fn spans_of(&self, kind: SpanKind) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.span_type == kind)
    }

    /// Mark the trace as finished with the given status.
    pub fn end(&mut self, status: TraceStatus) {
        self.status = status;
        self.execution_time_ms = Some((now_ms() - self.timestamp_ms).max(0));
    }

    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.trace_id.clone(),
            status: self.status,
            timestamp_ms: self.timestamp_ms,
            execution_time_ms: self.execution_time_ms,
            user_message: self.request_metadata.user_message.chars().take(PREVIEW_LEN).collect(),
            span_count: self.spans.len(),
        }
    }
}

/// Compact listing entry for a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub status: TraceStatus,
    pub timestamp_ms: i64,
    pub execution_time_ms: Option<i64>,
    /// First characters of the user message.
    pub user_message: String,
    pub span_count: usize,
}
