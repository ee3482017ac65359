//! Declarative form validation
//!
//! A [`ValidationSchema`] is a list of per-field rules evaluated against the
//! JSON form of a builder's values. Required-ness can depend on the current
//! value of a sibling field, e.g. `runtimeStack` is required unless
//! `buildProvider` is `GitHubAction`.
//!
//! Empty means missing, `null`, or a string of only whitespace. Checks only
//! run on non-empty values.

use appsvc_core::types::FieldErrorKind;
use appsvc_core::{Error, FieldError, Result};
use regex::Regex;
use serde_json::{json, Value};

/// Predicate over sibling field values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals { field: String, value: String },
    NotEquals { field: String, value: String },
    OneOf { field: String, values: Vec<String> },
    /// The field holds a non-empty value
    Present(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(field: &str, value: &str) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn not_equals(field: &str, value: &str) -> Self {
        Self::NotEquals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn one_of(field: &str, values: &[&str]) -> Self {
        Self::OneOf {
            field: field.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn present(field: &str) -> Self {
        Self::Present(field.to_string())
    }

    pub fn evaluate(&self, values: &Value) -> bool {
        match self {
            Self::Equals { field, value } => field_text(values, field).as_deref() == Some(value),
            Self::NotEquals { field, value } => field_text(values, field).as_deref() != Some(value),
            Self::OneOf { field, values: allowed } => {
                field_text(values, field).is_some_and(|v| allowed.contains(&v))
            }
            Self::Present(field) => non_empty_text(values, field).is_some(),
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(values)),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(values)),
            Self::Not(condition) => !condition.evaluate(values),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::Equals { field, value } => json!({
                "properties": { field.as_str(): { "const": value } },
                "required": [field]
            }),
            Self::NotEquals { field, value } => json!({
                "not": Self::equals(field, value).to_json_schema()
            }),
            Self::OneOf { field, values } => json!({
                "properties": { field.as_str(): { "enum": values } },
                "required": [field]
            }),
            Self::Present(field) => present(field),
            Self::All(conditions) => json!({
                "allOf": conditions.iter().map(Self::to_json_schema).collect::<Vec<_>>()
            }),
            Self::Any(conditions) => json!({
                "anyOf": conditions.iter().map(Self::to_json_schema).collect::<Vec<_>>()
            }),
            Self::Not(condition) => json!({ "not": condition.to_json_schema() }),
        }
    }
}

/// When a field must hold a non-empty value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    RequiredWhen(Condition),
    RequiredUnless(Condition),
}

impl Requirement {
    pub fn is_required(&self, values: &Value) -> bool {
        match self {
            Self::Required => true,
            Self::Optional => false,
            Self::RequiredWhen(condition) => condition.evaluate(values),
            Self::RequiredUnless(condition) => !condition.evaluate(values),
        }
    }
}

/// Constraint on a non-empty value
#[derive(Debug, Clone)]
pub enum Check {
    Pattern(Regex),
    OneOf(Vec<String>),
    /// Equal to another field's value. Not representable in JSON Schema and
    /// left out of [`ValidationSchema::to_json_schema`].
    MatchesField(String),
    MaxLength(usize),
}

impl Check {
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| v.to_string()).collect())
    }

    fn apply(&self, field: &str, value: &str, values: &Value) -> Option<FieldError> {
        match self {
            Self::Pattern(regex) if !regex.is_match(value) => Some(FieldError::new(
                field,
                FieldErrorKind::Pattern,
                format!("{} has an invalid format", field),
            )),
            Self::OneOf(allowed) if !allowed.iter().any(|a| a == value) => Some(FieldError::new(
                field,
                FieldErrorKind::NotAllowed,
                format!("{} must be one of: {}", field, allowed.join(", ")),
            )),
            Self::MatchesField(other) if field_text(values, other).unwrap_or_default() != value => {
                Some(FieldError::new(
                    field,
                    FieldErrorKind::Mismatch,
                    format!("{} must match {}", field, other),
                ))
            }
            Self::MaxLength(max) if value.chars().count() > *max => Some(FieldError::new(
                field,
                FieldErrorKind::TooLong,
                format!("{} must be at most {} characters", field, max),
            )),
            _ => None,
        }
    }

    fn to_json_schema(&self) -> Option<Value> {
        match self {
            Self::Pattern(regex) => Some(json!({ "pattern": regex.as_str() })),
            Self::OneOf(values) => Some(json!({ "enum": values })),
            Self::MaxLength(max) => Some(json!({ "maxLength": max })),
            Self::MatchesField(_) => None,
        }
    }
}

/// Rule for one form field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub requirement: Requirement,
    pub checks: Vec<Check>,
}

impl FieldRule {
    pub fn new(field: &str, requirement: Requirement) -> Self {
        Self {
            field: field.to_string(),
            requirement,
            checks: Vec::new(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(field, Requirement::Required)
    }

    pub fn optional(field: &str) -> Self {
        Self::new(field, Requirement::Optional)
    }

    pub fn required_when(field: &str, condition: Condition) -> Self {
        Self::new(field, Requirement::RequiredWhen(condition))
    }

    pub fn required_unless(field: &str, condition: Condition) -> Self {
        Self::new(field, Requirement::RequiredUnless(condition))
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Errors for this field, required-ness first
    pub fn validate(&self, values: &Value) -> Vec<FieldError> {
        match non_empty_text(values, &self.field) {
            None if self.requirement.is_required(values) => vec![FieldError::required(&self.field)],
            None => Vec::new(),
            Some(value) => self
                .checks
                .iter()
                .filter_map(|check| check.apply(&self.field, &value, values))
                .collect(),
        }
    }
}

/// Ordered set of field rules
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    rules: Vec<FieldRule>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn rule_for(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Every violation, in rule order
    pub fn validate(&self, values: &Value) -> Vec<FieldError> {
        self.rules.iter().flat_map(|r| r.validate(values)).collect()
    }

    pub fn ensure_valid(&self, values: &Value) -> Result<()> {
        let errors = self.validate(values);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::validation_failed(errors))
        }
    }

    /// Export as a JSON Schema document.
    ///
    /// Conditional requirements become `if`/`then`/`else` blocks; a present
    /// value must also be non-empty so the export agrees with [`validate`](Self::validate).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut all_of = Vec::new();

        for rule in &self.rules {
            let checks: Vec<Value> = rule.checks.iter().filter_map(Check::to_json_schema).collect();
            let property = if checks.is_empty() {
                json!({})
            } else {
                json!({ "anyOf": [ { "enum": ["", null] }, { "allOf": checks } ] })
            };
            properties.insert(rule.field.clone(), property);

            match &rule.requirement {
                Requirement::Required => all_of.push(present(&rule.field)),
                Requirement::Optional => {}
                Requirement::RequiredWhen(condition) => all_of.push(json!({
                    "if": condition.to_json_schema(),
                    "then": present(&rule.field)
                })),
                Requirement::RequiredUnless(condition) => all_of.push(json!({
                    "if": condition.to_json_schema(),
                    "else": present(&rule.field)
                })),
            }
        }

        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": properties,
            "allOf": all_of
        })
    }
}

fn present(field: &str) -> Value {
    json!({
        "required": [field],
        "properties": { field: { "not": { "enum": ["", null] } } }
    })
}

fn non_empty_text(values: &Value, field: &str) -> Option<String> {
    field_text(values, field).filter(|v| !v.trim().is_empty())
}

/// A field's value as text; `None` when missing or null
fn field_text(values: &Value, field: &str) -> Option<String> {
    match values.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
