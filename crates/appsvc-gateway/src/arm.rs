//! ARM implementation of the resource gateway

use crate::envelope::{GatewayError, GatewayResponse};
use crate::traits::ResourceGateway;
use anyhow::{Context, Result};
use appsvc_core::types::ArmConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Gateway that talks to Azure Resource Manager over HTTPS
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    token: Option<String>,
}

impl ArmClient {
    /// Create a client from the `arm` config section and an optional bearer token
    pub fn new(config: &ArmConfig, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build ARM HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Absolute URL for a resource id.
    ///
    /// Resource ids may carry their own `api-version` query; the client's
    /// default is only appended when none is present.
    pub fn request_url(&self, resource_id: &str) -> Result<Url> {
        let raw = if resource_id.starts_with("https://") || resource_id.starts_with("http://") {
            resource_id.to_string()
        } else {
            let path = if resource_id.starts_with('/') {
                resource_id.to_string()
            } else {
                format!("/{}", resource_id)
            };
            format!("{}{}", self.endpoint, path)
        };

        let mut url = Url::parse(&raw).with_context(|| format!("Invalid resource id: {}", resource_id))?;
        if !url.query_pairs().any(|(k, _)| k == "api-version") {
            url.query_pairs_mut().append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    async fn send(&self, method: Method, resource_id: &str, body: Option<&Value>) -> GatewayResponse<Value> {
        let url = match self.request_url(resource_id) {
            Ok(url) => url,
            Err(e) => return GatewayResponse::failure(GatewayError::new(format!("{:#}", e))),
        };

        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        execute(request).await
    }
}

/// Send a request and fold the outcome into an envelope
pub(crate) async fn execute(request: RequestBuilder) -> GatewayResponse<Value> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Request failed before a response arrived: {}", e);
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else {
                e.to_string()
            };
            return GatewayResponse::failure(GatewayError::new(message));
        }
    };

    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            return GatewayResponse::failure(
                GatewayError::new(format!("Failed to read response body: {}", e))
                    .with_status(status.as_u16()),
            )
        }
    };

    if status.is_success() {
        parse_success_body(&text)
    } else {
        debug!("HTTP {}: {}", status, text);
        GatewayResponse::failure(parse_error_body(
            status.as_u16(),
            status.canonical_reason(),
            &text,
        ))
    }
}

fn parse_success_body(text: &str) -> GatewayResponse<Value> {
    if text.trim().is_empty() {
        return GatewayResponse::ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => GatewayResponse::ok(value),
        Err(e) => GatewayResponse::failure(GatewayError::new(format!(
            "Response was not valid JSON: {}",
            e
        ))),
    }
}

/// Build a failure from an ARM error body.
///
/// ARM answers `{"error": {"code", "message"}}`; some resource providers
/// answer `{"Code", "Message"}` instead.
fn parse_error_body(status: u16, reason: Option<&str>, text: &str) -> GatewayError {
    let fallback = || {
        let message = if text.trim().is_empty() {
            reason.unwrap_or("Request failed").to_string()
        } else {
            text.trim().to_string()
        };
        GatewayError::new(message).with_status(status)
    };

    let Ok(body) = serde_json::from_str::<Value>(text) else {
        return fallback();
    };
    let inner = body.get("error").unwrap_or(&body);
    let field = |lower: &str, upper: &str| {
        inner
            .get(lower)
            .or_else(|| inner.get(upper))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match field("message", "Message") {
        Some(message) => {
            let error = GatewayError::new(message).with_status(status);
            match field("code", "Code") {
                Some(code) => error.with_code(code),
                None => error,
            }
        }
        None => fallback(),
    }
}

#[async_trait]
impl ResourceGateway for ArmClient {
    async fn get(&self, resource_id: &str) -> GatewayResponse<Value> {
        self.send(Method::GET, resource_id, None).await
    }

    async fn put(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value> {
        self.send(Method::PUT, resource_id, Some(body)).await
    }

    async fn patch(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value> {
        self.send(Method::PATCH, resource_id, Some(body)).await
    }

    async fn post(&self, resource_id: &str, body: Option<&Value>) -> GatewayResponse<Value> {
        self.send(Method::POST, resource_id, body).await
    }

    async fn delete(&self, resource_id: &str) -> GatewayResponse<Value> {
        self.send(Method::DELETE, resource_id, None).await
    }
}
