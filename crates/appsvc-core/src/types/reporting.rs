//! Field-level validation errors and sub-request failures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of rule a form field violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldErrorKind {
    Required,
    Pattern,
    NotAllowed,
    Mismatch,
    TooLong,
}

/// A single form field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Form field name (camelCase, as bound in the form)
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a required-field error
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{} is required", field);
        Self::new(field, FieldErrorKind::Required, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One failed request of a multi-request submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailure {
    /// Logical target of the request (e.g. "appsettings", "sourcecontrol")
    pub target: String,
    pub resource_id: String,
    pub message: String,
}

impl RequestFailure {
    pub fn new(
        target: impl Into<String>,
        resource_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            resource_id: resource_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.target, self.resource_id, self.message)
    }
}

/// A request of a submission that was never issued because an earlier
/// stage it depended on failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRequest {
    pub target: String,
    pub resource_id: String,
}

impl SkippedRequest {
    pub fn new(target: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for SkippedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): not attempted", self.target, self.resource_id)
    }
}
