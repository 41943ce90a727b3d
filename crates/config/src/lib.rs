//! Configuration loading, validation, and management for dvagent.
//!
//! Loads configuration from `~/.dvagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the model gateway token.
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

/// The root configuration structure.
///
/// Maps directly to `~/.dvagent/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model gateway settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Dataverse backend settings
    #[serde(default)]
    pub dataverse: DataverseConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Trace store settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// How requests reach the foundation model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStyle {
    /// `{host}/serving-endpoints/{model}/invocations`
    #[default]
    ServingEndpoints,
    /// `{base_url}/chat/completions` with the model in the body
    ChatCompletions,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Workspace host or OpenAI-compatible base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default)]
    pub endpoint_style: EndpointStyle,

    /// Default model / serving endpoint name
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Service token, the last link of the credential chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

fn default_model() -> String {
    "databricks-claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_model_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: None,
            endpoint_style: EndpointStyle::default(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
            service_token: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("host", &self.host)
            .field("endpoint_style", &self.endpoint_style)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("service_token", &redact(&self.service_token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration budget per chat request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Markdown file replacing the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<PathBuf>,
}

fn default_max_iterations() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt_file: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DataverseConfig {
    /// Environment URL, e.g. `https://org.crm.dynamics.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// OAuth authority base; the tenant and token path are appended
    #[serde(default = "default_authority")]
    pub authority: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_data_timeout")]
    pub data_timeout_secs: u64,

    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    #[serde(default = "default_token_timeout")]
    pub token_timeout_secs: u64,
}

fn default_authority() -> String {
    "https://login.microsoftonline.com".into()
}
fn default_api_version() -> String {
    "v9.2".into()
}
fn default_data_timeout() -> u64 {
    30
}
fn default_metadata_timeout() -> u64 {
    60
}
fn default_token_timeout() -> u64 {
    30
}

impl Default for DataverseConfig {
    fn default() -> Self {
        Self {
            host: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority: default_authority(),
            api_version: default_api_version(),
            data_timeout_secs: default_data_timeout(),
            metadata_timeout_secs: default_metadata_timeout(),
            token_timeout_secs: default_token_timeout(),
        }
    }
}

impl std::fmt::Debug for DataverseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataverseConfig")
            .field("host", &self.host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("authority", &self.authority)
            .field("api_version", &self.api_version)
            .field("data_timeout_secs", &self.data_timeout_secs)
            .field("metadata_timeout_secs", &self.metadata_timeout_secs)
            .field("token_timeout_secs", &self.token_timeout_secs)
            .finish()
    }
}

impl DataverseConfig {
    /// Names of the settings still missing for client-credentials auth.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("host", &self.host),
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Entries kept by the debug request log
    #[serde(default = "default_request_log_capacity")]
    pub request_log_capacity: usize,

    /// Allowed CORS origins. Empty = allow any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_request_log_capacity() -> usize {
    50
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            request_log_capacity: default_request_log_capacity(),
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Traces kept in memory before FIFO eviction
    #[serde(default = "default_max_traces")]
    pub max_traces: usize,
}

fn default_max_traces() -> usize {
    100
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_traces: default_max_traces(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.dvagent/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables (highest priority). `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("DATABRICKS_HOST") {
            self.model.host = Some(host);
        }
        if let Some(model) = get("DVAGENT_MODEL") {
            self.model.default_model = model;
        }
        if let Some(host) = get("DATAVERSE_HOST") {
            self.dataverse.host = Some(host);
        }
        if let Some(tenant) = get("DATAVERSE_TENANT_ID") {
            self.dataverse.tenant_id = Some(tenant);
        }
        if let Some(client_id) = get("DATAVERSE_CLIENT_ID") {
            self.dataverse.client_id = Some(client_id);
        }
        if let Some(secret) = get("DATAVERSE_CLIENT_SECRET") {
            self.dataverse.client_secret = Some(secret);
        }
        if let Some(port) = get("DATABRICKS_APP_PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid DATABRICKS_APP_PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dvagent")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.telemetry.max_traces == 0 {
            return Err(ConfigError::ValidationError(
                "telemetry.max_traces must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.default_model, "databricks-claude-sonnet-4");
        assert_eq!(config.model.max_tokens, 2048);
        assert_eq!(config.model.timeout_secs, 120);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.telemetry.max_traces, 100);
        assert_eq!(config.gateway.request_log_capacity, 50);
        assert_eq!(config.dataverse.api_version, "v9.2");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.default_model, config.model.default_model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.model.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.telemetry.max_traces = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.endpoint_style, EndpointStyle::ServingEndpoints);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[model]
host = "https://adb-123.azuredatabricks.net"
endpoint_style = "chat_completions"

[agent]
max_iterations = 3

[dataverse]
host = "https://org.crm.dynamics.com"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model.endpoint_style, EndpointStyle::ChatCompletions);
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.dataverse.missing_fields(), vec!["tenant_id", "client_id", "client_secret"]);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model\nhost = ").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABRICKS_HOST", "adb-1.azuredatabricks.net"),
            ("DVAGENT_MODEL", "databricks-meta-llama"),
            ("DATAVERSE_HOST", "https://org.crm.dynamics.com"),
            ("DATAVERSE_TENANT_ID", "tenant"),
            ("DATAVERSE_CLIENT_ID", "client"),
            ("DATAVERSE_CLIENT_SECRET", "secret"),
            ("DATABRICKS_APP_PORT", "8080"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.model.host.as_deref(), Some("adb-1.azuredatabricks.net"));
        assert_eq!(config.model.default_model, "databricks-meta-llama");
        assert_eq!(config.gateway.port, 8080);
        assert!(config.dataverse.is_complete());
    }

    #[test]
    fn bad_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| (k == "DATABRICKS_APP_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.model.service_token = Some("dapi-very-secret".into());
        config.dataverse.client_secret = Some("client-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("databricks-claude-sonnet-4"));
        assert!(toml_str.contains("max_traces"));
    }
}
