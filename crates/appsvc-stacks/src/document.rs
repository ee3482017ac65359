//! On-disk stack document layouts and their conversion into the model
//!
//! Two layouts exist. The current one (2020-06-01 onwards) nests
//! `majorVersions[].minorVersions[]` and stores per-OS settings either under
//! `platforms` (web apps) or `stackSettings.{windows,linux}RuntimeSettings`
//! (function apps). The legacy 2020-05-01 layout has a flat `versions[]` list
//! whose `supportedPlatforms[]` entries each name their own OS.

use crate::model::{
    AppInsightsSettings, MajorVersion, MinorVersion, PlatformMap, PlatformSettings,
    StackDefinition,
};
use appsvc_core::schema::{LEGACY_STACK_SCHEMA, STACK_SCHEMA};
use appsvc_core::{Error, Os, Result, SchemaValidator};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// Which document layout a catalog revision uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentLayout {
    Current,
    Legacy,
}

impl DocumentLayout {
    pub(crate) fn schema_name(self) -> &'static str {
        match self {
            Self::Current => STACK_SCHEMA,
            Self::Legacy => LEGACY_STACK_SCHEMA,
        }
    }
}

/// Parse a document holding one stack object or an array of them.
pub(crate) fn parse_stacks(
    validator: &SchemaValidator,
    layout: DocumentLayout,
    document: Value,
) -> Result<Vec<StackDefinition>> {
    let items = match document {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| parse_stack(validator, layout, item))
        .collect()
}

fn parse_stack(
    validator: &SchemaValidator,
    layout: DocumentLayout,
    item: Value,
) -> Result<StackDefinition> {
    validator.validate(&item, layout.schema_name())?;
    let stack = match layout {
        DocumentLayout::Current => serde_json::from_value::<CurrentStackDoc>(item)?.into_model(),
        DocumentLayout::Legacy => serde_json::from_value::<LegacyStackDoc>(item)?.into_model()?,
    };
    trace!(
        "Parsed stack '{}' with {} major versions",
        stack.value,
        stack.major_versions.len()
    );
    Ok(stack)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentStackDoc {
    value: String,
    display_text: String,
    #[serde(default)]
    sort_order: Option<u32>,
    #[serde(default)]
    preferred_os: Option<Os>,
    major_versions: Vec<CurrentMajorDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentMajorDoc {
    value: String,
    display_text: String,
    #[serde(default)]
    sort_order: Option<u32>,
    minor_versions: Vec<CurrentMinorDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentMinorDoc {
    value: String,
    display_text: String,
    #[serde(default)]
    sort_order: Option<u32>,
    #[serde(default)]
    platforms: Option<PlatformMap>,
    #[serde(default)]
    stack_settings: Option<FunctionStackSettingsDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionStackSettingsDoc {
    #[serde(default)]
    windows_runtime_settings: Option<PlatformSettings>,
    #[serde(default)]
    linux_runtime_settings: Option<PlatformSettings>,
}

impl CurrentStackDoc {
    fn into_model(self) -> StackDefinition {
        StackDefinition {
            value: self.value,
            display_text: self.display_text,
            sort_order: self.sort_order,
            preferred_os: self.preferred_os,
            major_versions: self
                .major_versions
                .into_iter()
                .map(|major| MajorVersion {
                    value: major.value,
                    display_text: major.display_text,
                    sort_order: major.sort_order,
                    minor_versions: major
                        .minor_versions
                        .into_iter()
                        .map(CurrentMinorDoc::into_model)
                        .collect(),
                })
                .collect(),
        }
    }
}

impl CurrentMinorDoc {
    fn into_model(self) -> MinorVersion {
        let platforms = match (self.platforms, self.stack_settings) {
            (Some(platforms), _) => platforms,
            (None, Some(settings)) => PlatformMap {
                windows: settings.windows_runtime_settings,
                linux: settings.linux_runtime_settings,
            },
            (None, None) => PlatformMap::default(),
        };
        MinorVersion {
            value: self.value,
            display_text: self.display_text,
            sort_order: self.sort_order,
            platforms,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyStackDoc {
    value: String,
    display_text: String,
    #[serde(default)]
    sort_order: Option<u32>,
    #[serde(default)]
    preferred_os: Option<Os>,
    versions: Vec<LegacyVersionDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyVersionDoc {
    value: String,
    display_text: String,
    #[serde(default)]
    sort_order: Option<u32>,
    #[serde(default)]
    is_default: bool,
    supported_platforms: Vec<LegacyPlatformDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPlatformDoc {
    os: Os,
    runtime_version: String,
    #[serde(default)]
    sort_order: Option<u32>,
    #[serde(default)]
    is_preview: bool,
    #[serde(default)]
    is_deprecated: bool,
    #[serde(default)]
    is_hidden: bool,
    #[serde(default)]
    application_insights_enabled: bool,
    #[serde(default)]
    app_settings_dictionary: BTreeMap<String, String>,
    #[serde(default)]
    site_config_properties_dictionary: BTreeMap<String, Value>,
}

impl LegacyStackDoc {
    /// Each legacy version becomes a major version holding a single minor
    /// version with the same value.
    fn into_model(self) -> Result<StackDefinition> {
        let mut major_versions = Vec::with_capacity(self.versions.len());

        for version in self.versions {
            let mut platforms = PlatformMap::default();
            for platform in version.supported_platforms {
                let slot = platforms.get_mut(platform.os);
                if slot.is_some() {
                    return Err(Error::invalid_catalog(format!(
                        "{} {} lists {} more than once",
                        self.value, version.value, platform.os
                    )));
                }
                *slot = Some(PlatformSettings {
                    runtime_version: platform.runtime_version,
                    sort_order: platform.sort_order,
                    is_default: version.is_default,
                    is_deprecated: platform.is_deprecated,
                    is_hidden: platform.is_hidden,
                    is_preview: platform.is_preview,
                    app_insights_settings: AppInsightsSettings {
                        is_supported: platform.application_insights_enabled,
                    },
                    app_settings_dictionary: platform.app_settings_dictionary,
                    site_config_properties_dictionary: platform.site_config_properties_dictionary,
                    ..Default::default()
                });
            }

            major_versions.push(MajorVersion {
                value: version.value.clone(),
                display_text: version.display_text.clone(),
                sort_order: version.sort_order,
                minor_versions: vec![MinorVersion {
                    value: version.value,
                    display_text: version.display_text,
                    sort_order: version.sort_order,
                    platforms,
                }],
            });
        }

        Ok(StackDefinition {
            value: self.value,
            display_text: self.display_text,
            sort_order: self.sort_order,
            preferred_os: self.preferred_os,
            major_versions,
        })
    }
}
