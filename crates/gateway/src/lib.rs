//! HTTP API gateway for dvagent.
//!
//! Exposes the chat endpoint, trace inspection, tool and model listing,
//! health and a request log for debugging.
//!
//! Built on Axum; every request passes through the request log and
//! `TraceLayer`.

pub mod api;
pub mod models;
pub mod request_log;

use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use dvagent_agent::AgentLoop;
use dvagent_config::{AppConfig, TOKEN_ENV};
use dvagent_core::credential::CredentialChain;
use dvagent_core::provider::Provider;
use dvagent_core::Error;
use dvagent_providers::OpenAiCompatProvider;
use dvagent_telemetry::TraceStore;

pub use api::api_router;
pub use request_log::{RequestLog, RequestLogEntry};

/// Defaults applied to chat requests that omit them.
#[derive(Debug, Clone)]
pub struct ChatDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.default_model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
        }
    }
}

/// Shared application state for the gateway.
pub struct ApiState {
    pub agent: Arc<AgentLoop>,
    pub credentials: CredentialChain,
    pub defaults: ChatDefaults,
    pub requests: Arc<RequestLog>,
}

impl ApiState {
    pub fn traces(&self) -> &Arc<TraceStore> {
        self.agent.traces()
    }
}

pub type SharedApiState = Arc<ApiState>;

/// Wire the model gateway, Dataverse backend, tools, trace store and agent
/// from configuration.
///
/// Fails only when the model gateway host is unset or the tool set does not
/// match its definitions; an incomplete `[dataverse]` section still yields a
/// working state whose tool calls report the missing settings.
pub fn build_state(config: &AppConfig) -> Result<SharedApiState, Error> {
    if config.model.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
        return Err(Error::Config {
            message: "model.host is not set (config file or DATABRICKS_HOST)".into(),
        });
    }

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config.model));
    let backend = dvagent_dataverse::backend_from_config(&config.dataverse);
    let tools = Arc::new(dvagent_tools::dataverse_registry(backend)?);
    let traces = Arc::new(TraceStore::new(config.telemetry.max_traces));

    let agent = AgentLoop::new(provider, tools, traces).with_config(&config.agent);

    Ok(Arc::new(ApiState {
        agent: Arc::new(agent),
        credentials: CredentialChain::standard(TOKEN_ENV, config.model.service_token.clone()),
        defaults: ChatDefaults::from_config(config),
        requests: Arc::new(RequestLog::new(config.gateway.request_log_capacity)),
    }))
}

/// CORS for the configured origins. No origins ⇒ same-origin only.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the full router: API routes, request log, CORS and HTTP tracing.
pub fn build_router(state: SharedApiState, cors_origins: &[String]) -> Router {
    let requests = Arc::clone(&state.requests);
    api_router(state)
        .layer(middleware::from_fn_with_state(requests, request_log::record_requests))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config)?;
    info!(
        tools = ?state.agent.tools().names(),
        model = %state.defaults.model,
        max_traces = state.traces().max_traces(),
        "Agent ready"
    );

    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.model.host = Some("adb-123.azuredatabricks.net".into());
        config.telemetry.max_traces = 7;
        config.gateway.request_log_capacity = 3;
        config
    }

    #[test]
    fn build_state_requires_model_host() {
        let err = build_state(&AppConfig::default()).err().unwrap();
        assert!(err.to_string().contains("model.host"));
    }

    #[test]
    fn build_state_without_dataverse_still_registers_tools() {
        let state = build_state(&configured()).unwrap();
        assert_eq!(state.agent.tools().len(), dvagent_tools::DATAVERSE_TOOLS.len());
        assert_eq!(state.traces().max_traces(), 7);
        assert_eq!(state.defaults.model, "databricks-claude-sonnet-4");
        assert_eq!(state.agent.max_iterations(), 10);
    }

    #[test]
    fn invalid_cors_origin_is_skipped() {
        let state = build_state(&configured()).unwrap();
        let _router = build_router(state, &["http://localhost:3000".into(), "bad\norigin".into()]);
    }
}
