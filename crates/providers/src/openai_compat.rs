//! OpenAI-compatible model gateway.
//!
//! Works with Databricks Foundation Model serving endpoints
//! (`/serving-endpoints/{model}/invocations`) and any plain
//! `/chat/completions` endpoint. Both speak the OpenAI tool-calling
//! envelope; they differ only in URL layout and whether the model is named
//! in the body.

use async_trait::async_trait;
use dvagent_config::{EndpointStyle, ModelConfig};
use dvagent_core::error::ProviderError;
use dvagent_core::message::{Message, MessageToolCall, Role};
use dvagent_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest error body excerpt carried into a `ProviderError`.
const ERROR_BODY_LIMIT: usize = 200;

/// An OpenAI-compatible model gateway.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    style: EndpointStyle,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider against `base_url`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        style: EndpointStyle,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: normalize_host(&base_url.into()),
            style,
            client,
        }
    }

    /// Databricks serving endpoints on a workspace host (convenience constructor).
    pub fn databricks(host: &str) -> Self {
        Self::new("databricks", host, EndpointStyle::ServingEndpoints, Duration::from_secs(120))
    }

    /// Build from the `[model]` config section.
    pub fn from_config(config: &ModelConfig) -> Self {
        let name = match config.endpoint_style {
            EndpointStyle::ServingEndpoints => "databricks",
            EndpointStyle::ChatCompletions => "openai-compatible",
        };
        Self::new(
            name,
            config.host.as_deref().unwrap_or_default(),
            config.endpoint_style,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The URL a request for `model` is posted to.
    pub fn endpoint_url(&self, model: &str) -> String {
        match self.style {
            EndpointStyle::ServingEndpoints => {
                format!("{}/serving-endpoints/{}/invocations", self.base_url, model)
            }
            EndpointStyle::ChatCompletions => format!("{}/chat/completions", self.base_url),
        }
    }

    fn request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        if self.style == EndpointStyle::ChatCompletions {
            body["model"] = serde_json::json!(request.model);
        }

        body
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: serde_json::Value::String(tc.arguments.clone()),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Turn the first choice of a parsed response into our domain response.
    fn into_response(api_response: ApiResponse, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: match tc.function.arguments {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => "{}".into(),
                    other => other.to_string(),
                },
            })
            .collect();

        let message = Message {
            role: Role::Assistant,
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            tool_call_id: None,
        };

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            finish_reason: choice.finish_reason,
            usage,
            model: api_response.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

/// Force an https scheme when none is given and drop trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    host.trim_end_matches('/').to_string()
}

/// Prefer the JSON `message` field of an error body, else a text excerpt.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(ERROR_BODY_LIMIT).collect())
}

#[async_trait]
impl dvagent_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = self.endpoint_url(&request.model);
        let body = self.request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(request.credential.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(format!(
                "HTTP {status}: invalid token or insufficient permissions"
            )));
        }

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model gateway returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_detail(&error_body),
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::into_response(api_response, &request.model)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    /// A JSON-encoded string per the OpenAI format; some gateways send an object.
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvagent_core::{Credential, Provider};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> ProviderRequest {
        ProviderRequest {
            model: model.into(),
            messages: vec![Message::system("You are helpful"), Message::user("list 2 tables")],
            temperature: 0.7,
            max_tokens: 2048,
            tools: vec![ToolDefinition {
                name: "list_tables".into(),
                description: "List tables".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            credential: Credential::new("dapi-test"),
        }
    }

    fn provider(server: &MockServer, style: EndpointStyle) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", server.uri(), style, Duration::from_secs(5))
    }

    #[test]
    fn host_is_normalized() {
        let provider = OpenAiCompatProvider::databricks("adb-123.azuredatabricks.net/");
        assert_eq!(provider.base_url(), "https://adb-123.azuredatabricks.net");
        assert_eq!(
            provider.endpoint_url("databricks-claude-sonnet-4"),
            "https://adb-123.azuredatabricks.net/serving-endpoints/databricks-claude-sonnet-4/invocations"
        );

        let plain = OpenAiCompatProvider::new(
            "openai",
            "http://localhost:8080/v1",
            EndpointStyle::ChatCompletions,
            Duration::from_secs(1),
        );
        assert_eq!(plain.endpoint_url("gpt-4o"), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::assistant_tool_calls(
            None,
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "list_tables".into(),
                arguments: r#"{"top":2}"#.into(),
            }],
        );
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], r#"{"top":2}"#);
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = Message::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn object_arguments_are_reencoded() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","tool_calls":[{"id":"c1","function":{"name":"read_query","arguments":{"table_name":"account"}}}]},"finish_reason":"tool_calls"}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let resp = OpenAiCompatProvider::into_response(parsed, "m").unwrap();
        assert_eq!(resp.model, "m");
        assert_eq!(resp.message.tool_calls[0].arguments, r#"{"table_name":"account"}"#);
        assert!(resp.message.content.is_none());
    }

    #[tokio::test]
    async fn serving_endpoint_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/serving-endpoints/databricks-claude-sonnet-4/invocations"))
            .and(header("authorization", "Bearer dapi-test"))
            .and(body_partial_json(serde_json::json!({
                "max_tokens": 2048,
                "tools": [{"type": "function", "function": {"name": "list_tables"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "claude-sonnet-4",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {"name": "list_tables", "arguments": "{\"top\": 2}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = provider(&server, EndpointStyle::ServingEndpoints)
            .complete(request("databricks-claude-sonnet-4"))
            .await
            .unwrap();

        assert!(resp.has_tool_calls());
        assert_eq!(resp.message.tool_calls[0].id, "call_abc");
        assert_eq!(resp.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(resp.usage.unwrap().total_tokens, 138);
    }

    #[tokio::test]
    async fn chat_completions_sends_model_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o",
                "choices": [{"message": {"role": "assistant", "content": "Found 2 tables."}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let resp = provider(&server, EndpointStyle::ChatCompletions)
            .complete(request("gpt-4o"))
            .await
            .unwrap();
        assert_eq!(resp.message.text(), "Found 2 tables.");
        assert!(!resp.has_tool_calls());
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/serving-endpoints/limited/invocations"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;
        Mock::given(path("/serving-endpoints/forbidden/invocations"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(path("/serving-endpoints/broken/invocations"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "endpoint is scaling"})),
            )
            .mount(&server)
            .await;

        let p = provider(&server, EndpointStyle::ServingEndpoints);
        assert!(matches!(
            p.complete(request("limited")).await,
            Err(ProviderError::RateLimited { retry_after_secs: 12 })
        ));
        assert!(matches!(
            p.complete(request("forbidden")).await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
        match p.complete(request("broken")).await {
            Err(ProviderError::ApiError { status_code, message }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "endpoint is scaling");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_and_garbage_are_invalid() {
        let server = MockServer::start().await;
        Mock::given(path("/serving-endpoints/empty/invocations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;
        Mock::given(path("/serving-endpoints/garbage/invocations"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let p = provider(&server, EndpointStyle::ServingEndpoints);
        assert!(matches!(p.complete(request("empty")).await, Err(ProviderError::InvalidResponse(_))));
        assert!(matches!(p.complete(request("garbage")).await, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let server = MockServer::start().await;
        Mock::given(path("/serving-endpoints/slow/invocations"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let p = OpenAiCompatProvider::new(
            "test",
            server.uri(),
            EndpointStyle::ServingEndpoints,
            Duration::from_millis(50),
        );
        assert!(matches!(p.complete(request("slow")).await, Err(ProviderError::Timeout(_))));
    }
}
