//! Binding editor support
//!
//! Connection fields of a binding offer the app settings whose values look
//! like a connection string of the right kind.

use crate::validation::{Check, FieldRule, ValidationSchema};
use appsvc_stacks::{BindingConfigMetadata, BindingSettingResource, BindingSettingValue};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const NEW_SUFFIX: &str = " (new)";

static INT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("int regex is valid"));

/// App setting names valid for a binding field of `resource`, in key order.
///
/// A setting created in the editor but not saved yet is listed first as
/// `"<name> (new)"`.
pub fn filter_app_settings(
    resource: BindingSettingResource,
    app_settings: &BTreeMap<String, String>,
    new_setting: Option<&str>,
) -> Vec<String> {
    let markers: &[&str] = match resource {
        BindingSettingResource::Storage => &["accountname", "accountkey"],
        BindingSettingResource::EventHub | BindingSettingResource::ServiceBus => {
            &["sb://", "sharedaccesskeyname"]
        }
        BindingSettingResource::DocumentDb => &["accountendpoint", "documents.azure.com"],
        BindingSettingResource::AppSetting => &[],
    };

    let new = new_setting.map(|name| format!("{}{}", name, NEW_SUFFIX));
    let matching = app_settings
        .iter()
        .filter(|(_, value)| {
            let value = value.to_lowercase();
            markers.iter().all(|m| value.contains(m))
        })
        .map(|(key, _)| key.clone());

    new.into_iter().chain(matching).collect()
}

/// Setting name behind a dropdown option, without the `(new)` marker
pub fn setting_name_from_option(option: &str) -> &str {
    option.strip_suffix(NEW_SUFFIX).unwrap_or(option)
}

/// Validation rules for the settings of one binding type
pub fn binding_validation_schema(metadata: &BindingConfigMetadata) -> ValidationSchema {
    metadata
        .settings
        .iter()
        .fold(ValidationSchema::new(), |schema, setting| {
            let mut rule = if setting.required {
                FieldRule::required(&setting.name)
            } else {
                FieldRule::optional(&setting.name)
            };
            if setting.value == BindingSettingValue::Int {
                rule = rule.check(Check::Pattern(INT_PATTERN.clone()));
            }
            schema.rule(rule)
        })
}
