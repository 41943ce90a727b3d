//! OAuth 2.0 client-credentials flow against Microsoft Entra ID.

use dvagent_core::BackendError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens are refreshed this long before they actually expire.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// Lifetime assumed when the token response has no `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Client-credentials token source with an in-memory cache.
pub struct DataverseAuth {
    http: reqwest::Client,
    token_endpoint: String,
    scope: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    cache: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl DataverseAuth {
    /// `authority` is the login base (`https://login.microsoftonline.com`);
    /// the token endpoint becomes `{authority}/{tenant}/oauth2/v2.0/token`
    /// and the scope `{host}/.default`.
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        host: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            token_endpoint: format!("{}/{}/oauth2/v2.0/token", authority.trim_end_matches('/'), tenant_id),
            scope: format!("{}/.default", host.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout,
            cache: Mutex::new(None),
        }
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// A valid access token, from cache when it is not about to expire.
    pub async fn access_token(&self) -> Result<String, BackendError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
            debug!("Dataverse token near expiry, refreshing");
        }

        let token = self.fetch_token().await?;
        let expires_in = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        info!(expires_in_secs = expires_in.as_secs(), "Obtained Dataverse access token");

        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + expires_in.saturating_sub(REFRESH_BUFFER),
        });
        Ok(token.access_token)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<TokenResponse, BackendError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => format!(
                    "{}: {}",
                    err.error.as_deref().unwrap_or("unknown"),
                    err.error_description.as_deref().unwrap_or("unknown")
                ),
                Err(_) => body.chars().take(200).collect(),
            };
            warn!(status = status.as_u16(), "Failed to obtain Dataverse access token");
            return Err(BackendError::Auth(format!(
                "Failed to obtain Dataverse access token (HTTP {}): {detail}",
                status.as_u16()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("token response: {e}")))
    }
}
