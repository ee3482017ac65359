//! Stack catalog data model
//!
//! These are the normalized shapes every catalog revision is converted into,
//! whatever its on-disk layout. Field names serialize in the camelCase used by
//! the stack metadata documents.

use appsvc_core::Os;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A runtime family such as `node` or `dotnetCore`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDefinition {
    /// Stable key
    pub value: String,
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_os: Option<Os>,
    #[serde(default)]
    pub major_versions: Vec<MajorVersion>,
}

impl StackDefinition {
    /// Find a major version by exact value
    pub fn major(&self, value: &str) -> Option<&MajorVersion> {
        self.major_versions.iter().find(|m| m.value == value)
    }

    /// Iterate every `(major, minor)` pair in declaration order
    pub fn minors(&self) -> impl Iterator<Item = (&MajorVersion, &MinorVersion)> {
        self.major_versions
            .iter()
            .flat_map(|major| major.minor_versions.iter().map(move |minor| (major, minor)))
    }

    /// Whether any minor version offers a platform for `os`
    pub fn has_platform_for(&self, os: Os) -> bool {
        self.minors().any(|(_, minor)| minor.platforms.get(os).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorVersion {
    pub value: String,
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub minor_versions: Vec<MinorVersion>,
}

impl MajorVersion {
    pub fn minor(&self, value: &str) -> Option<&MinorVersion> {
        self.minor_versions.iter().find(|m| m.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorVersion {
    pub value: String,
    pub display_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub platforms: PlatformMap,
}

/// Per-OS platform settings of a minor version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<PlatformSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<PlatformSettings>,
}

impl PlatformMap {
    pub fn get(&self, os: Os) -> Option<&PlatformSettings> {
        match os {
            Os::Windows => self.windows.as_ref(),
            Os::Linux => self.linux.as_ref(),
        }
    }

    pub fn get_mut(&mut self, os: Os) -> &mut Option<PlatformSettings> {
        match os {
            Os::Windows => &mut self.windows,
            Os::Linux => &mut self.linux,
        }
    }

    /// Keep only the settings for `os`
    pub fn retain_os(&mut self, os: Os) {
        match os {
            Os::Windows => self.linux = None,
            Os::Linux => self.windows = None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Os, &PlatformSettings)> {
        Os::ALL
            .into_iter()
            .filter_map(move |os| self.get(os).map(|p| (os, p)))
    }
}

/// Concrete runtime configuration of one minor version on one OS
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    /// Literal string written into site config, e.g. `DOTNETCORE|3.1`
    pub runtime_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_deprecated: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_preview: bool,
    #[serde(default)]
    pub remote_debugging_supported: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_of_life_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "deserialize_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub projected_end_of_life_date: Option<NaiveDate>,
    #[serde(default)]
    pub app_insights_settings: AppInsightsSettings,
    #[serde(default)]
    pub git_hub_action_settings: GitHubActionSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub app_settings_dictionary: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub site_config_properties_dictionary: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_functions_extension_versions: Vec<String>,
}

impl PlatformSettings {
    /// Whether the end-of-life date has passed. Platforms past EOL stay in
    /// the catalog and stay resolvable.
    pub fn is_end_of_life(&self, today: NaiveDate) -> bool {
        self.end_of_life_date.is_some_and(|eol| eol < today)
    }

    /// Whether the platform may be offered in a selection list
    pub fn is_selectable(&self) -> bool {
        !self.is_hidden
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInsightsSettings {
    #[serde(default)]
    pub is_supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubActionSettings {
    #[serde(default)]
    pub is_supported: bool,
    /// Version pinned in generated workflows, e.g. `3.1.102`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_version: Option<String>,
}

/// Accept `YYYY-MM-DD` or a full ISO timestamp (as served by the metadata
/// endpoint) and keep the calendar date.
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        let date_part = s.get(..10).unwrap_or(&s);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_defaults() {
        let platform: PlatformSettings =
            serde_json::from_value(json!({ "runtimeVersion": "PYTHON|3.8" })).unwrap();
        assert!(!platform.is_hidden);
        assert!(!platform.app_insights_settings.is_supported);
        assert!(platform.git_hub_action_settings.supported_version.is_none());
        assert!(platform.end_of_life_date.is_none());
    }

    #[test]
    fn test_date_accepts_timestamp() {
        let platform: PlatformSettings = serde_json::from_value(json!({
            "runtimeVersion": "~12",
            "endOfLifeDate": "2022-05-01T00:00:00.000Z",
            "projectedEndOfLifeDate": "2021-08-21"
        }))
        .unwrap();
        assert_eq!(
            platform.end_of_life_date,
            NaiveDate::from_ymd_opt(2022, 5, 1)
        );
        assert_eq!(
            platform.projected_end_of_life_date,
            NaiveDate::from_ymd_opt(2021, 8, 21)
        );
    }

    #[test]
    fn test_invalid_date_rejected() {
        let result: Result<PlatformSettings, _> = serde_json::from_value(json!({
            "runtimeVersion": "~12",
            "endOfLifeDate": "20201-08-21"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_end_of_life_flag() {
        let platform = PlatformSettings {
            runtime_version: "~8".into(),
            end_of_life_date: NaiveDate::from_ymd_opt(2020, 1, 31),
            ..Default::default()
        };
        let before = NaiveDate::from_ymd_opt(2020, 1, 30).unwrap();
        let after = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        assert!(!platform.is_end_of_life(before));
        assert!(platform.is_end_of_life(after));
    }

    #[test]
    fn test_platform_map_retain() {
        let mut map = PlatformMap {
            windows: Some(PlatformSettings::default()),
            linux: Some(PlatformSettings::default()),
        };
        map.retain_os(Os::Linux);
        assert!(map.windows.is_none());
        assert_eq!(map.iter().map(|(os, _)| os).collect::<Vec<_>>(), vec![Os::Linux]);
    }
}
