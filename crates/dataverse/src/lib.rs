//! Dataverse backend for dvagent.
//!
//! [`DataverseAuth`] acquires and caches OAuth client-credentials tokens;
//! [`DataverseClient`] implements `dvagent_core::DataBackend` over the
//! Dataverse Web API (OData v4).

pub mod auth;
pub mod client;
pub mod unconfigured;

use dvagent_config::DataverseConfig;
use dvagent_core::DataBackend;
use std::sync::Arc;

pub use auth::DataverseAuth;
pub use client::DataverseClient;
pub use unconfigured::UnconfiguredBackend;

/// The configured client, or an [`UnconfiguredBackend`] explaining what is
/// missing.
pub fn backend_from_config(config: &DataverseConfig) -> Arc<dyn DataBackend> {
    match DataverseClient::from_config(config) {
        Ok(client) => {
            tracing::info!(api_base = %client.api_base(), "Dataverse backend configured");
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dataverse is not configured; tool calls will fail");
            Arc::new(UnconfiguredBackend::new(match e {
                dvagent_core::BackendError::Config(reason) => reason,
                other => other.to_string(),
            }))
        }
    }
}
