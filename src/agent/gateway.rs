use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::descriptor::AgentDescriptor;
use super::payload::{AgentPayload, InvocationResult};

/// Everything that can go wrong during a call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or serialization fault while talking to the endpoint
    #[error("{0}")]
    Transport(String),
    /// Non-success status code from the envelope or the HTTP layer
    #[error("Agent returned status {0}")]
    RemoteStatus(i64),
    /// Response present but not in the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Request envelope sent to every endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub query: String,
    pub trace_id: String,
}

impl InvocationRequest {
    pub fn new(target: &AgentDescriptor, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            trace_id: new_trace_id(target),
        }
    }
}

/// `socratiq-<millis>-<8 hex>`, with a `sophie-` infix for orchestrator calls
fn new_trace_id(target: &AgentDescriptor) -> String {
    let prefix = if target.is_orchestrator() {
        "socratiq-sophie"
    } else {
        "socratiq"
    };
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &uuid[..8])
}

/// Carries a request to a named endpoint and returns the raw JSON reply
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, function: &str, request: &InvocationRequest) -> Result<Value, GatewayError>;
}

/// HTTP transport: POST `<base_url>/<function>` with the JSON request
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, function: &str) -> String {
        format!("{}/{}", self.base_url, function)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, function: &str, request: &InvocationRequest) -> Result<Value, GatewayError> {
        let response = self.client.post(self.url(function)).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::RemoteStatus(i64::from(status.as_u16())));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

/// Turns a raw reply into a payload. The reply is either the payload itself
/// or an envelope `{statusCode, body}` whose body is a JSON string or object.
pub fn normalize(raw: Value) -> Result<AgentPayload, GatewayError> {
    let mut object = match raw {
        Value::Object(object) => object,
        other => {
            return Err(GatewayError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let Some(status) = object.remove("statusCode") else {
        return into_payload(Value::Object(object));
    };

    let code = status
        .as_i64()
        .ok_or_else(|| GatewayError::Malformed(format!("statusCode is not an integer: {}", status)))?;
    if !(200..300).contains(&code) {
        return Err(GatewayError::RemoteStatus(code));
    }

    match object.remove("body") {
        Some(Value::String(body)) => {
            let parsed: Value = serde_json::from_str(&body)
                .map_err(|e| GatewayError::Malformed(format!("body is not valid JSON: {}", e)))?;
            into_payload(parsed)
        }
        Some(body @ Value::Object(_)) => into_payload(body),
        Some(other) => Err(GatewayError::Malformed(format!(
            "body must be a string or an object, got {}",
            json_kind(&other)
        ))),
        None => Err(GatewayError::Malformed("envelope has no body".into())),
    }
}

fn into_payload(value: Value) -> Result<AgentPayload, GatewayError> {
    if !value.is_object() {
        return Err(GatewayError::Malformed(format!(
            "payload must be a JSON object, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| GatewayError::Malformed(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Sends queries to agents and the orchestrator
#[derive(Clone)]
pub struct InvocationGateway {
    transport: Arc<dyn Transport>,
}

impl InvocationGateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Gateway over HTTP
    pub fn http(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(base_url, timeout)?)))
    }

    /// Invoke `target` once. Never fails: every error becomes `Failure`.
    pub async fn invoke(&self, target: &AgentDescriptor, query: &str) -> InvocationResult {
        let request = InvocationRequest::new(target, query);
        let started = Instant::now();
        tracing::info!(
            agent = %target.name,
            function = %target.function,
            trace_id = %request.trace_id,
            "Invoking agent"
        );

        let outcome = match self.transport.call(&target.function, &request).await {
            Ok(raw) => normalize(raw),
            Err(e) => Err(e),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(payload) => {
                tracing::info!(trace_id = %request.trace_id, elapsed_ms, "Agent call succeeded");
                InvocationResult::Success(payload)
            }
            Err(e) => {
                tracing::warn!(trace_id = %request.trace_id, elapsed_ms, error = %e, "Agent call failed");
                let message = e.to_string();
                if message.is_empty() {
                    InvocationResult::Failure(format!("{} call failed", target.name))
                } else {
                    InvocationResult::Failure(message)
                }
            }
        }
    }
}
