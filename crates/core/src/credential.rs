//! Credential resolution for the model gateway.
//!
//! A [`CredentialChain`] is an ordered list of [`CredentialProvider`]s; the
//! first one that yields a non-empty token wins.

use std::fmt;
use crate::error::AuthError;

/// Header the hosting platform uses to forward the end user's token.
pub const FORWARDED_TOKEN_HEADER: &str = "x-forwarded-access-token";

/// An opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Per-request inputs a provider may draw on.
#[derive(Debug, Clone, Default)]
pub struct CredentialContext {
    /// Value of the forwarded access token header, if the request had one
    pub forwarded_access_token: Option<String>,
}

/// One link of the credential fallback chain.
pub trait CredentialProvider: Send + Sync {
    /// Short label used in logs and in the "tried" list of [`AuthError`].
    fn label(&self) -> String;

    fn resolve(&self, ctx: &CredentialContext) -> Option<Credential>;
}

/// Takes the token forwarded by the hosting platform.
pub struct ForwardedHeaderCredential;

impl CredentialProvider for ForwardedHeaderCredential {
    fn label(&self) -> String {
        "forwarded_header".into()
    }

    fn resolve(&self, ctx: &CredentialContext) -> Option<Credential> {
        non_empty(ctx.forwarded_access_token.as_deref())
    }
}

/// Reads a token from an environment variable at resolve time.
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn label(&self) -> String {
        format!("env:{}", self.var)
    }

    fn resolve(&self, _ctx: &CredentialContext) -> Option<Credential> {
        non_empty(std::env::var(&self.var).ok().as_deref())
    }
}

/// A token fixed at startup (e.g. the configured service token).
pub struct StaticCredential {
    token: Option<String>,
}

impl StaticCredential {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl CredentialProvider for StaticCredential {
    fn label(&self) -> String {
        "config:service_token".into()
    }

    fn resolve(&self, _ctx: &CredentialContext) -> Option<Credential> {
        non_empty(self.token.as_deref())
    }
}

fn non_empty(token: Option<&str>) -> Option<Credential> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Credential::new)
}

/// Ordered credential strategies; first hit wins.
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain.
    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Forwarded header, then `env_var`, then the configured service token.
    pub fn standard(env_var: &str, service_token: Option<String>) -> Self {
        Self::new()
            .with(ForwardedHeaderCredential)
            .with(EnvCredential::new(env_var))
            .with(StaticCredential::new(service_token))
    }

    pub fn resolve(&self, ctx: &CredentialContext) -> Result<Credential, AuthError> {
        for provider in &self.providers {
            if let Some(credential) = provider.resolve(ctx) {
                tracing::debug!(source = %provider.label(), "Resolved model gateway credential");
                return Ok(credential);
            }
        }
        let tried: Vec<String> = self.providers.iter().map(|p| p.label()).collect();
        Err(AuthError::NoCredential { tried: tried.join(", ") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_VAR: &str = "DVAGENT_TEST_TOKEN_THAT_IS_NEVER_SET";

    #[test]
    fn debug_is_redacted() {
        let cred = Credential::new("dapi-secret");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.expose(), "dapi-secret");
    }

    #[test]
    fn forwarded_header_wins() {
        let chain = CredentialChain::standard(UNSET_VAR, Some("service".into()));
        let ctx = CredentialContext {
            forwarded_access_token: Some("user-token".into()),
        };
        assert_eq!(chain.resolve(&ctx).unwrap().expose(), "user-token");
    }

    #[test]
    fn falls_back_to_service_token() {
        let chain = CredentialChain::standard(UNSET_VAR, Some("service".into()));
        let ctx = CredentialContext {
            forwarded_access_token: Some("   ".into()),
        };
        assert_eq!(chain.resolve(&ctx).unwrap().expose(), "service");
    }

    #[test]
    fn empty_chain_result_names_sources() {
        let chain = CredentialChain::standard(UNSET_VAR, None);
        let err = chain.resolve(&CredentialContext::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("forwarded_header"));
        assert!(msg.contains(UNSET_VAR));
        assert!(msg.contains("config:service_token"));
    }
}
