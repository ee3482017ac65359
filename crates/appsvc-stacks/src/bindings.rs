//! Function binding metadata served by the portal metadata endpoint
//!
//! Loaded once per binding editor and only ever filtered.

use appsvc_core::schema::BINDING_CONFIG_SCHEMA;
use appsvc_core::{Result, SchemaValidator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The binding metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_version: Option<String>,
    #[serde(default)]
    pub bindings: Vec<BindingConfigMetadata>,
}

impl BindingsConfig {
    /// Validate and deserialize a binding metadata document
    pub fn from_value(validator: &SchemaValidator, value: Value) -> Result<Self> {
        validator.validate(&value, BINDING_CONFIG_SCHEMA)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Find the metadata for a binding type and direction
    pub fn binding(&self, binding_type: &str, direction: BindingDirection) -> Option<&BindingConfigMetadata> {
        self.bindings
            .iter()
            .find(|b| b.binding_type.eq_ignore_ascii_case(binding_type) && b.direction == direction)
    }

    pub fn by_direction(&self, direction: BindingDirection) -> impl Iterator<Item = &BindingConfigMetadata> {
        self.bindings.iter().filter(move |b| b.direction == direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingDirection {
    Trigger,
    In,
    Out,
}

/// One binding type, e.g. `blobTrigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingConfigMetadata {
    #[serde(rename = "type")]
    pub binding_type: String,
    pub display_name: String,
    pub direction: BindingDirection,
    #[serde(default)]
    pub enabled_in_try_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub settings: Vec<BindingConfigDefinition>,
}

/// A single field of the binding editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingConfigDefinition {
    pub name: String,
    pub value: BindingSettingValue,
    /// Class of app setting whose values are valid choices for this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BindingSettingResource>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingSettingValue {
    String,
    Boolean,
    Enum,
    CheckBoxList,
    Int,
}

/// Kind of connection a binding field points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingSettingResource {
    Storage,
    EventHub,
    ServiceBus,
    AppSetting,
    #[serde(rename = "DocumentDB")]
    DocumentDb,
}

impl fmt::Display for BindingSettingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Storage => "Storage",
            Self::EventHub => "EventHub",
            Self::ServiceBus => "ServiceBus",
            Self::AppSetting => "AppSetting",
            Self::DocumentDb => "DocumentDB",
        };
        f.write_str(name)
    }
}
