//! Errors that end an agent run.

use dvagent_core::ProviderError;
use thiserror::Error;

/// Why a chat request could not produce an answer.
///
/// Tool failures never show up here; they are fed back to the model.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The caller's messages cannot start a conversation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The model gateway failed; the trace is marked ERROR.
    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failure_message() {
        let err = AgentError::from(ProviderError::Timeout("120s elapsed".into()));
        assert_eq!(err.to_string(), "Model call failed: Request timed out: 120s elapsed");
    }
}
