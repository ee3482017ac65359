//! Error types for appsvc-core

use crate::types::{FieldError, Os, RequestFailure, SkippedRequest};
use thiserror::Error;

/// Result type alias using appsvc-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a `(stack, major, minor)` key failed to match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSegment {
    Stack,
    MajorVersion,
    MinorVersion,
}

impl std::fmt::Display for CatalogSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack => write!(f, "stack"),
            Self::MajorVersion => write!(f, "major version"),
            Self::MinorVersion => write!(f, "minor version"),
        }
    }
}

/// Core error types for appsvc
#[derive(Error, Debug)]
pub enum Error {
    /// A catalog key segment does not exist
    #[error("Unknown {segment} '{key}'")]
    NotFound { segment: CatalogSegment, key: String },

    /// The catalog entry exists but has no settings for the requested OS
    #[error("{stack} {version} is not supported on {os}")]
    UnsupportedOnOs {
        stack: String,
        version: String,
        os: Os,
    },

    /// One or more form fields violate the validation schema
    #[error("Validation failed:\n{}", format_field_errors(.errors))]
    ValidationFailed { errors: Vec<FieldError> },

    /// The resource gateway returned a failure envelope
    #[error("{target} request failed: {message}")]
    UpstreamRequestFailed { target: String, message: String },

    /// A submission was only partly applied: several requests failed,
    /// some succeeded, or dependent requests were never issued
    #[error("{}", partial_failure_message(.succeeded, .failures, .skipped))]
    PartialUpdateFailure {
        succeeded: usize,
        failures: Vec<RequestFailure>,
        skipped: Vec<SkippedRequest>,
    },

    /// No catalog revision is registered for the API version
    #[error("No stack catalog for API version '{api_version}'")]
    UnknownApiVersion { api_version: String },

    /// Catalog data violates a structural invariant
    #[error("Invalid stack catalog: {message}")]
    InvalidCatalog { message: String },

    /// The editing session is not in a state that allows the operation
    #[error("Cannot {operation} while session is {state}")]
    InvalidSessionState {
        operation: &'static str,
        state: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Schema validation error
    #[error("Schema validation failed:\n{errors}")]
    SchemaValidation { errors: String },

    /// Schema not found
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

fn partial_failure_message(succeeded: &usize, failures: &[RequestFailure], skipped: &[SkippedRequest]) -> String {
    let first = failures
        .first()
        .map(|f| f.to_string())
        .unwrap_or_default();
    let mut message = format!(
        "{} of {} update requests failed: {}",
        failures.len(),
        failures.len() + *succeeded,
        first
    );
    if !skipped.is_empty() {
        message.push_str(&format!(" ({} not attempted)", skipped.len()));
    }
    message
}

impl Error {
    /// Create a not found error for a catalog key segment
    pub fn not_found(segment: CatalogSegment, key: impl Into<String>) -> Self {
        Self::NotFound {
            segment,
            key: key.into(),
        }
    }

    /// Create an unsupported-on-OS error
    pub fn unsupported_on_os(stack: impl Into<String>, version: impl Into<String>, os: Os) -> Self {
        Self::UnsupportedOnOs {
            stack: stack.into(),
            version: version.into(),
            os,
        }
    }

    /// Create a validation error from field errors
    pub fn validation_failed(errors: Vec<FieldError>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create an upstream failure error
    pub fn upstream(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamRequestFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an unknown API version error
    pub fn unknown_api_version(api_version: impl Into<String>) -> Self {
        Self::UnknownApiVersion {
            api_version: api_version.into(),
        }
    }

    /// Create an invalid catalog error
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Create an invalid session state error
    pub fn invalid_session_state(operation: &'static str, state: impl ToString) -> Self {
        Self::InvalidSessionState {
            operation,
            state: state.to_string(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a schema validation error from a list of errors
    pub fn schema_validation(errors: Vec<String>) -> Self {
        Self::SchemaValidation {
            errors: errors.join("\n"),
        }
    }

    /// Create a schema not found error
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }

    /// Whether the error is scoped to an editing session and lets the user retry or re-select.
    ///
    /// Only local I/O and configuration problems are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::UnsupportedOnOs { .. }
                | Self::ValidationFailed { .. }
                | Self::UpstreamRequestFailed { .. }
                | Self::PartialUpdateFailure { .. }
                | Self::InvalidSessionState { .. }
        )
    }

    /// Field-level errors carried by a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }

    /// Failed sub-requests carried by an update failure
    pub fn request_failures(&self) -> Vec<&RequestFailure> {
        match self {
            Self::PartialUpdateFailure { failures, .. } => failures.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Requests of a partly applied submission that were never issued
    pub fn skipped_requests(&self) -> &[SkippedRequest] {
        match self {
            Self::PartialUpdateFailure { skipped, .. } => skipped,
            _ => &[],
        }
    }
}
