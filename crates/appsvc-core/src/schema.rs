//! JSON Schema validation for stack catalog and metadata documents

use crate::error::{Error, Result};
use jsonschema::Validator;
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Embedded schema files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../schemas/"]
#[prefix = ""]
struct EmbeddedSchemas;

/// Schema for a single stack in the current (2020-06-01) catalog layout
pub const STACK_SCHEMA: &str = "stacks-2020-06-01";

/// Schema for a single stack in the legacy (2020-05-01) catalog layout
pub const LEGACY_STACK_SCHEMA: &str = "stacks-2020-05-01";

/// Schema for the binding metadata document
pub const BINDING_CONFIG_SCHEMA: &str = "binding-config";

/// Schema validator with pre-compiled schemas
#[derive(Debug)]
pub struct SchemaValidator {
    /// Compiled schemas by name
    schemas: HashMap<String, Validator>,
}

impl SchemaValidator {
    /// Create a new schema validator with embedded schemas
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();

        for file in EmbeddedSchemas::iter() {
            let Some(name) = file.strip_suffix(".schema.json") else {
                continue;
            };

            debug!("Loading embedded schema: {}", name);

            if let Some(content) = EmbeddedSchemas::get(&file) {
                let json_str = std::str::from_utf8(&content.data).map_err(|_| {
                    Error::invalid_config(format!("Invalid UTF-8 in schema: {}", file))
                })?;
                let schema_value: Value = serde_json::from_str(json_str)?;
                schemas.insert(name.to_string(), compile(name, &schema_value)?);
            }
        }

        if schemas.is_empty() {
            return Err(Error::schema_not_found("no embedded schemas"));
        }

        Ok(Self { schemas })
    }

    /// Load from external schema directory (for development)
    pub fn from_directory(path: &Path) -> Result<Self> {
        let mut schemas = HashMap::new();

        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if !file_path.extension().is_some_and(|e| e == "json") {
                    continue;
                }
                let Some(stem) = file_path.file_stem() else {
                    continue;
                };
                let name = stem
                    .to_string_lossy()
                    .trim_end_matches(".schema")
                    .to_string();

                debug!("Loading schema from file: {:?}", file_path);

                let content = std::fs::read_to_string(&file_path)?;
                let schema_value: Value = serde_json::from_str(&content)?;
                let compiled = compile(&name, &schema_value)?;
                schemas.insert(name, compiled);
            }
        }

        if schemas.is_empty() {
            return Err(Error::schema_not_found(format!(
                "No schemas found in {:?}",
                path
            )));
        }

        Ok(Self { schemas })
    }

    /// Validate JSON value against a schema
    pub fn validate(&self, value: &Value, schema_name: &str) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| Error::schema_not_found(schema_name))?;

        let errors: Vec<String> = schema
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    format!("  - {}", e)
                } else {
                    format!("  - {}: {}", path, e)
                }
            })
            .collect();

        if !errors.is_empty() {
            return Err(Error::schema_validation(errors));
        }

        Ok(())
    }

    /// Validate a JSON file against a schema
    pub fn validate_file(&self, path: &Path, schema_name: &str) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        self.validate(&value, schema_name)
    }

    /// Check if a schema exists
    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// List available schemas, sorted by name
    pub fn list_schemas(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn compile(name: &str, schema: &Value) -> Result<Validator> {
    jsonschema::validator_for(schema)
        .map_err(|e| Error::invalid_config(format!("Failed to compile schema {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schemas_present() {
        let validator = SchemaValidator::new().unwrap();
        assert_eq!(
            validator.list_schemas(),
            vec![BINDING_CONFIG_SCHEMA, LEGACY_STACK_SCHEMA, STACK_SCHEMA]
        );
    }

    #[test]
    fn test_validate_current_stack() {
        let validator = SchemaValidator::new().unwrap();
        let stack = json!({
            "displayText": "Python",
            "value": "python",
            "majorVersions": [{
                "displayText": "Python 3",
                "value": "3",
                "minorVersions": [{
                    "displayText": "Python 3.8",
                    "value": "3.8",
                    "platforms": {
                        "linux": { "runtimeVersion": "PYTHON|3.8" }
                    }
                }]
            }]
        });
        assert!(validator.validate(&stack, STACK_SCHEMA).is_ok());
    }

    #[test]
    fn test_minor_without_platforms_rejected() {
        let validator = SchemaValidator::new().unwrap();
        let stack = json!({
            "displayText": "Python",
            "value": "python",
            "majorVersions": [{
                "displayText": "Python 3",
                "value": "3",
                "minorVersions": [{ "displayText": "Python 3.8", "value": "3.8" }]
            }]
        });
        let err = validator.validate(&stack, STACK_SCHEMA).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }

    #[test]
    fn test_legacy_platform_requires_os() {
        let validator = SchemaValidator::new().unwrap();
        let stack = json!({
            "displayText": "PowerShell Core",
            "value": "powershell",
            "versions": [{
                "displayText": "7.0",
                "value": "7",
                "supportedPlatforms": [{ "runtimeVersion": "~7" }]
            }]
        });
        let err = validator.validate(&stack, LEGACY_STACK_SCHEMA).unwrap_err();
        assert!(err.to_string().contains("os"));
    }

    #[test]
    fn test_validate_nonexistent_schema() {
        let validator = SchemaValidator::new().unwrap();
        let err = validator
            .validate(&json!({}), "nonexistent-schema")
            .unwrap_err();
        assert!(matches!(err, Error::SchemaNotFound { .. }));
        assert!(err.to_string().contains("nonexistent-schema"));
    }

    #[test]
    fn test_from_directory_empty_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = SchemaValidator::from_directory(temp_dir.path());
        assert!(matches!(result, Err(Error::SchemaNotFound { .. })));
    }

    #[test]
    fn test_from_directory_loads_named_schema() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("custom.schema.json"),
            r#"{"type": "object", "required": ["value"]}"#,
        )
        .unwrap();
        let validator = SchemaValidator::from_directory(temp_dir.path()).unwrap();
        assert!(validator.has_schema("custom"));
        assert!(validator.validate(&json!({}), "custom").is_err());
    }
}
