//! Uniform response envelope

use appsvc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure details carried by an unsuccessful response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    /// HTTP status, when the request reached the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// ARM error code, e.g. `Conflict`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), _) => write!(f, "{} ({})", self.message, code),
            (None, Some(status)) => write!(f, "{} (HTTP {})", self.message, status),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// `{ success, data, error }` result of one gateway call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl<T> GatewayResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: GatewayError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Error message of a failed response, or an empty string
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GatewayResponse<U> {
        GatewayResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Convert into a `Result`, naming `target` in the upstream error
    pub fn into_result(self, target: &str) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(Error::upstream(target, "response carried no data")),
            (false, _) => Err(Error::upstream(
                target,
                self.error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}
