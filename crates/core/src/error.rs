//! Error types for the dvagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all dvagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the model gateway. All of them are fatal to the
/// current chat request.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of a single tool invocation. The agent loop converts these into
/// a `{success: false, error}` payload instead of aborting.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures of the data backend, kept distinguishable so callers can tell a
/// missing table from an expired token or a dropped connection.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend authentication failed: {0}")]
    Auth(String),

    #[error("Backend transport error: {0}")]
    Transport(String),

    #[error("Backend API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Backend returned an unexpected payload: {0}")]
    InvalidResponse(String),

    #[error("Backend not configured: {0}")]
    Config(String),
}

/// Raised before any model call when no credential can be resolved. Callers
/// surface it directly (HTTP 401, CLI exit) rather than through [`Error`].
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No authentication token available (tried: {tried})")]
    NoCredential { tried: String },
}
