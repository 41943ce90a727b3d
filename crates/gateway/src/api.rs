//! HTTP API: chat, traces, tools, health and the request log.
//!
//! Endpoints:
//!
//! - `POST /api/agent/message`      - Run the agent on a message list
//! - `GET  /api/agent/tools`        - Tool definitions (OpenAI function envelope)
//! - `GET  /api/chat/models`        - Selectable models and the default
//! - `GET  /api/traces/list`        - Trace summaries, most recent first
//! - `GET  /api/traces/{trace_id}`  - One full trace
//! - `GET  /api/health`             - Liveness plus trace and tool counts
//! - `GET  /api/debug/requests`     - Recent HTTP requests

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use dvagent_agent::{AgentError, AgentRequest, validate_messages};
use dvagent_core::credential::{CredentialContext, FORWARDED_TOKEN_HEADER};
use dvagent_core::message::Message;
use dvagent_telemetry::{Trace, TraceSummary};

use crate::SharedApiState;
use crate::models::{MODEL_CATALOG, ModelInfo};
use crate::request_log::RequestLogEntry;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the API router (without the outer middleware layers).
pub fn api_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/api/agent/message", post(chat_handler))
        .route("/api/agent/tools", get(list_tools_handler))
        .route("/api/chat/models", get(list_models_handler))
        .route("/api/traces/list", get(list_traces_handler))
        .route("/api/traces/{trace_id}", get(get_trace_handler))
        .route("/api/health", get(health_handler))
        .route("/api/debug/requests", get(list_requests_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub trace_id: String,
    pub iterations: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { detail: detail.into() }))
}

#[derive(Debug, Deserialize)]
pub struct TraceListQuery {
    #[serde(default = "default_trace_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_trace_limit() -> usize {
    50
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceListResponse {
    pub traces: Vec<TraceSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<serde_json::Value>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: &'static [ModelInfo],
    pub default: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub trace_count: usize,
    pub tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestLogQuery {
    #[serde(default = "default_request_limit")]
    pub limit: usize,
}

fn default_request_limit() -> usize {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestLogResponse {
    pub requests: Vec<RequestLogEntry>,
    pub total: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(messages = payload.messages.len(), "Chat request");

    validate_messages(&payload.messages).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    // Credentials are resolved before a trace exists
    let ctx = CredentialContext {
        forwarded_access_token: headers
            .get(FORWARDED_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };
    let credential = state.credentials.resolve(&ctx).map_err(|e| {
        warn!(error = %e, "Rejecting chat request without credentials");
        api_error(StatusCode::UNAUTHORIZED, e.to_string())
    })?;

    let defaults = &state.defaults;
    let request = AgentRequest {
        messages: payload.messages,
        model: payload
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.model.clone()),
        temperature: payload.temperature.unwrap_or(defaults.temperature),
        max_tokens: payload.max_tokens.unwrap_or(defaults.max_tokens),
        credential,
    };

    let trace_id = state.agent.start_trace(&request);
    match state.agent.run(&trace_id, request).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.response,
            trace_id,
            iterations: outcome.iterations,
        })),
        Err(e @ AgentError::InvalidRequest(_)) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!(trace_id = %trace_id, error = %e, "Chat request failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn list_tools_handler(State(state): State<SharedApiState>) -> Json<ToolListResponse> {
    let tools: Vec<_> = state
        .agent
        .tools()
        .definitions()
        .iter()
        .map(|d| d.to_function_envelope())
        .collect();

    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn list_models_handler(State(state): State<SharedApiState>) -> Json<ModelListResponse> {
    Json(ModelListResponse {
        models: MODEL_CATALOG,
        default: state.defaults.model.clone(),
    })
}

async fn list_traces_handler(
    State(state): State<SharedApiState>,
    Query(query): Query<TraceListQuery>,
) -> Json<TraceListResponse> {
    let traces = state.traces();
    Json(TraceListResponse {
        traces: traces.list_summaries(query.limit, query.offset),
        total: traces.get_total_traces(),
    })
}

async fn get_trace_handler(
    State(state): State<SharedApiState>,
    Path(trace_id): Path<String>,
) -> Result<Json<Trace>, ApiError> {
    state
        .traces()
        .get_trace(&trace_id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Trace '{trace_id}' not found")))
}

async fn health_handler(State(state): State<SharedApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        trace_count: state.traces().get_total_traces(),
        tools: state.agent.tools().names().into_iter().map(String::from).collect(),
    })
}

async fn list_requests_handler(
    State(state): State<SharedApiState>,
    Query(query): Query<RequestLogQuery>,
) -> Json<RequestLogResponse> {
    Json(RequestLogResponse {
        requests: state.requests.recent(query.limit),
        total: state.requests.len(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
