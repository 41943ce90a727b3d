//! Dataverse Web API client.
//!
//! Metadata calls (`EntityDefinitions`) get the longer metadata timeout;
//! record calls use the data timeout.

use crate::auth::DataverseAuth;
use async_trait::async_trait;
use dvagent_config::DataverseConfig;
use dvagent_core::backend::*;
use dvagent_core::BackendError;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Authenticated client for one Dataverse environment.
pub struct DataverseClient {
    http: reqwest::Client,
    auth: DataverseAuth,
    api_base: String,
    data_timeout: Duration,
    metadata_timeout: Duration,
}

impl DataverseClient {
    pub fn new(auth: DataverseAuth, http: reqwest::Client, host: &str, api_version: &str) -> Self {
        Self {
            http,
            auth,
            api_base: format!("{}/api/data/{}", host.trim_end_matches('/'), api_version),
            data_timeout: Duration::from_secs(30),
            metadata_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, data: Duration, metadata: Duration) -> Self {
        self.data_timeout = data;
        self.metadata_timeout = metadata;
        self
    }

    /// Build from the `[dataverse]` config section. Missing credentials ⇒
    /// `BackendError::Config` naming them.
    pub fn from_config(config: &DataverseConfig) -> Result<Self, BackendError> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(BackendError::Config(format!(
                "missing Dataverse settings: {}",
                missing.join(", ")
            )));
        }
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        let host = field(&config.host);

        let http = reqwest::Client::new();
        let auth = DataverseAuth::new(
            http.clone(),
            &config.authority,
            &field(&config.tenant_id),
            &host,
            field(&config.client_id),
            field(&config.client_secret),
            Duration::from_secs(config.token_timeout_secs),
        );

        Ok(Self::new(auth, http, &host, &config.api_version).with_timeouts(
            Duration::from_secs(config.data_timeout_secs),
            Duration::from_secs(config.metadata_timeout_secs),
        ))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Map<String, Value>>,
        timeout: Duration,
    ) -> Result<reqwest::Response, BackendError> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let token = self.auth.access_token().await?;

        debug!(method = %method, endpoint, "Dataverse API request");

        let mut request = self
            .http
            .request(method, &url)
            .timeout(timeout)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = odata_error_message(&text);
        warn!(status = status.as_u16(), endpoint, error = %message, "Dataverse API error");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if status == StatusCode::UNAUTHORIZED {
                    self.auth.invalidate().await;
                }
                BackendError::Auth(format!("HTTP {}: {message}", status.as_u16()))
            }
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            _ => BackendError::Api {
                status_code: status.as_u16(),
                message,
            },
        })
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, BackendError> {
        self.send(Method::GET, endpoint, query, None, timeout)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("{endpoint}: {e}")))
    }
}

/// `error.message` of an OData error body, else a text excerpt.
fn odata_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Escape a value for use inside an OData single-quoted literal.
fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn rows(mut payload: Value) -> Vec<Value> {
    match payload.get_mut("value").map(Value::take) {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    }
}

/// The user-facing label of a metadata `DisplayName` object.
fn localized_label(value: &Value) -> Option<String> {
    value
        .pointer("/DisplayName/UserLocalizedLabel/Label")
        .and_then(Value::as_str)
        .map(String::from)
}

fn table_info(entity: &Value) -> TableInfo {
    TableInfo {
        logical_name: entity["LogicalName"].as_str().unwrap_or_default().to_string(),
        display_name: localized_label(entity),
        entity_set_name: entity["EntitySetName"].as_str().map(String::from),
        is_custom: entity["IsCustomEntity"].as_bool().unwrap_or(false),
    }
}

/// Client-side evaluation of a `<Property> eq <literal>` filter.
///
/// The metadata endpoint rejects most OData query options, so
/// `EntityDefinitions` is fetched whole and narrowed here. Expressions that
/// are not a single equality are ignored with a warning.
#[derive(Debug, PartialEq)]
struct MetadataFilter {
    property: String,
    expected: Value,
}

impl MetadataFilter {
    fn parse(expr: &str) -> Option<Self> {
        let mut parts = expr.trim().splitn(3, ' ');
        let property = parts.next()?.trim();
        if !parts.next()?.eq_ignore_ascii_case("eq") {
            return None;
        }
        let literal = parts.next()?.trim();
        let expected = match literal {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            quoted if quoted.len() >= 2 && quoted.starts_with('\'') && quoted.ends_with('\'') => {
                Value::String(quoted[1..quoted.len() - 1].replace("''", "'"))
            }
            _ => return None,
        };
        Some(Self {
            property: property.to_string(),
            expected,
        })
    }

    fn matches(&self, entity: &Value) -> bool {
        entity.get(&self.property) == Some(&self.expected)
    }
}

#[async_trait]
impl DataBackend for DataverseClient {
    async fn list_tables(&self, filter: Option<&str>, top: u32) -> Result<Vec<TableInfo>, BackendError> {
        let payload = self.get_json("EntityDefinitions", &[], self.metadata_timeout).await?;
        let entities = rows(payload);
        debug!(total = entities.len(), "Fetched entity definitions");

        let predicate = match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(expr) => {
                let parsed = MetadataFilter::parse(expr);
                if parsed.is_none() {
                    warn!(filter = expr, "Unsupported metadata filter, returning unfiltered tables");
                }
                parsed
            }
            None => None,
        };

        let limit = if top == 0 { usize::MAX } else { top as usize };
        Ok(entities
            .iter()
            .filter(|e| predicate.as_ref().is_none_or(|p| p.matches(e)))
            .take(limit)
            .map(table_info)
            .collect())
    }

    async fn describe_table(&self, logical_name: &str) -> Result<TableSchema, BackendError> {
        let endpoint = format!("EntityDefinitions(LogicalName='{}')", quote_literal(logical_name));
        let payload = self
            .get_json(&endpoint, &[("$expand", "Attributes".to_string())], self.metadata_timeout)
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => BackendError::NotFound(format!("Table '{logical_name}' not found")),
                other => other,
            })?;

        if payload.as_object().is_none_or(Map::is_empty) {
            return Err(BackendError::InvalidResponse(format!(
                "Empty response for table '{logical_name}'"
            )));
        }

        let attributes = payload["Attributes"]
            .as_array()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|a| AttributeInfo {
                        logical_name: a["LogicalName"].as_str().unwrap_or_default().to_string(),
                        attribute_type: a["AttributeType"].as_str().map(String::from),
                        is_primary_id: a["IsPrimaryId"].as_bool().unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TableSchema {
            logical_name: payload["LogicalName"].as_str().unwrap_or(logical_name).to_string(),
            attributes,
        })
    }

    async fn entity_set_name(&self, logical_name: &str) -> Result<String, BackendError> {
        let query = [
            ("$filter", format!("LogicalName eq '{}'", quote_literal(logical_name))),
            ("$select", "EntitySetName".to_string()),
        ];
        let payload = self.get_json("EntityDefinitions", &query, self.metadata_timeout).await?;

        rows(payload)
            .first()
            .and_then(|e| e["EntitySetName"].as_str().map(String::from))
            .ok_or_else(|| BackendError::NotFound(format!("Table '{logical_name}' not found")))
    }

    async fn read_query(&self, query: &RecordQuery) -> Result<Vec<Map<String, Value>>, BackendError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if !query.select.is_empty() {
            params.push(("$select", query.select.join(",")));
        }
        if let Some(filter) = query.filter.as_deref().filter(|f| !f.is_empty()) {
            params.push(("$filter", filter.to_string()));
        }
        if let Some(order_by) = query.order_by.as_deref().filter(|o| !o.is_empty()) {
            params.push(("$orderby", order_by.to_string()));
        }
        if query.top > 0 {
            params.push(("$top", query.top.to_string()));
        }

        let payload = self.get_json(&query.entity_set, &params, self.data_timeout).await?;
        Ok(rows(payload)
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }

    async fn create_record(&self, entity_set: &str, fields: &Map<String, Value>) -> Result<String, BackendError> {
        let response = self
            .send(Method::POST, entity_set, &[], Some(fields), self.data_timeout)
            .await?;

        let entity_id = response
            .headers()
            .get("OData-EntityId")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::InvalidResponse("create response has no OData-EntityId header".into()))?;

        record_id_from_entity_url(entity_id)
            .ok_or_else(|| BackendError::InvalidResponse(format!("unrecognised OData-EntityId: {entity_id}")))
    }

    async fn update_record(
        &self,
        entity_set: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        let endpoint = format!("{entity_set}({record_id})");
        self.send(Method::PATCH, &endpoint, &[], Some(fields), self.data_timeout)
            .await?;
        Ok(())
    }
}

/// `https://org/api/data/v9.2/accounts(0000-...)` ⇒ `0000-...`
fn record_id_from_entity_url(url: &str) -> Option<String> {
    let start = url.rfind('(')? + 1;
    let id = url[start..].trim_end_matches(')');
    (!id.is_empty()).then(|| id.to_string())
}
