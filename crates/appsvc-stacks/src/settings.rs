//! ARM setting payloads derived from a platform entry

use crate::model::PlatformSettings;
use appsvc_core::Os;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Site config property holding the runtime string of a Linux app
pub const LINUX_FX_VERSION: &str = "linuxFxVersion";

/// One write into an ARM settings object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "kebab-case")]
pub enum SettingOp {
    AppSetting { key: String, value: String },
    SiteConfig { key: String, value: Value },
}

/// Key/value sets to write into the app settings and site config resources
///
/// Built by replaying an ordered list of [`SettingOp`]s: when two ops write
/// the same key, the later one wins. Maps are ordered so that the same
/// platform always produces byte-identical output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub runtime_version: String,
    pub app_settings: BTreeMap<String, String>,
    pub site_config: BTreeMap<String, Value>,
    #[serde(skip)]
    ops: Vec<SettingOp>,
}

impl RuntimeSettings {
    /// Replay `ops` in order
    pub fn from_ops(runtime_version: impl Into<String>, ops: Vec<SettingOp>) -> Self {
        let mut app_settings = BTreeMap::new();
        let mut site_config = BTreeMap::new();
        for op in &ops {
            match op {
                SettingOp::AppSetting { key, value } => {
                    app_settings.insert(key.clone(), value.clone());
                }
                SettingOp::SiteConfig { key, value } => {
                    site_config.insert(key.clone(), value.clone());
                }
            }
        }
        Self {
            runtime_version: runtime_version.into(),
            app_settings,
            site_config,
            ops,
        }
    }

    /// Ops in the order they were applied
    pub fn ops(&self) -> &[SettingOp] {
        &self.ops
    }

    /// Merge into caller-owned settings. Values from the platform overwrite
    /// existing values under the same key; other keys are left alone.
    pub fn apply_to(
        &self,
        app_settings: &mut BTreeMap<String, String>,
        site_config: &mut Map<String, Value>,
    ) {
        for (key, value) in &self.app_settings {
            app_settings.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.site_config {
            site_config.insert(key.clone(), value.clone());
        }
    }

    /// Whether applying these settings would leave both maps unchanged
    pub fn is_satisfied_by(
        &self,
        app_settings: &BTreeMap<String, String>,
        site_config: &Map<String, Value>,
    ) -> bool {
        self.app_settings
            .iter()
            .all(|(k, v)| app_settings.get(k) == Some(v))
            && self
                .site_config
                .iter()
                .all(|(k, v)| site_config.get(k) == Some(v))
    }
}

/// Ops for the platform's dictionaries: app settings first, then site
/// config, each in key order.
pub fn platform_ops(platform: &PlatformSettings) -> Vec<SettingOp> {
    let app_settings = platform
        .app_settings_dictionary
        .iter()
        .map(|(key, value)| SettingOp::AppSetting {
            key: key.clone(),
            value: value.clone(),
        });
    let site_config = platform
        .site_config_properties_dictionary
        .iter()
        .map(|(key, value)| SettingOp::SiteConfig {
            key: key.clone(),
            value: value.clone(),
        });
    app_settings.chain(site_config).collect()
}

/// Ops for a platform hosted on `os`. Linux apps additionally carry the
/// runtime string in `linuxFxVersion`, written last.
pub fn platform_ops_for(platform: &PlatformSettings, os: Os) -> Vec<SettingOp> {
    let mut ops = platform_ops(platform);
    if os == Os::Linux && !platform.runtime_version.is_empty() {
        ops.push(SettingOp::SiteConfig {
            key: LINUX_FX_VERSION.to_string(),
            value: Value::String(platform.runtime_version.clone()),
        });
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_write_wins() {
        let settings = RuntimeSettings::from_ops(
            "~12",
            vec![
                SettingOp::AppSetting {
                    key: "WEBSITE_NODE_DEFAULT_VERSION".into(),
                    value: "~10".into(),
                },
                SettingOp::AppSetting {
                    key: "WEBSITE_NODE_DEFAULT_VERSION".into(),
                    value: "~12".into(),
                },
            ],
        );
        assert_eq!(settings.app_settings["WEBSITE_NODE_DEFAULT_VERSION"], "~12");
        assert_eq!(settings.ops().len(), 2);
    }

    #[test]
    fn test_apply_to_overwrites_and_keeps_unrelated() {
        let settings = RuntimeSettings::from_ops(
            "Node|12",
            vec![
                SettingOp::AppSetting {
                    key: "FUNCTIONS_WORKER_RUNTIME".into(),
                    value: "node".into(),
                },
                SettingOp::SiteConfig {
                    key: "linuxFxVersion".into(),
                    value: json!("Node|12"),
                },
            ],
        );

        let mut app_settings = BTreeMap::from([
            ("FUNCTIONS_WORKER_RUNTIME".to_string(), "python".to_string()),
            ("MY_SETTING".to_string(), "keep".to_string()),
        ]);
        let mut site_config = Map::new();
        site_config.insert("linuxFxVersion".into(), json!("PYTHON|3.8"));
        site_config.insert("alwaysOn".into(), json!(true));

        assert!(!settings.is_satisfied_by(&app_settings, &site_config));
        settings.apply_to(&mut app_settings, &mut site_config);

        assert_eq!(app_settings["FUNCTIONS_WORKER_RUNTIME"], "node");
        assert_eq!(app_settings["MY_SETTING"], "keep");
        assert_eq!(site_config["linuxFxVersion"], json!("Node|12"));
        assert_eq!(site_config["alwaysOn"], json!(true));
        assert!(settings.is_satisfied_by(&app_settings, &site_config));
    }

    #[test]
    fn test_linux_fx_version_written_last() {
        let platform = PlatformSettings {
            runtime_version: "DOTNETCORE|3.1".into(),
            site_config_properties_dictionary: BTreeMap::from([(
                "linuxFxVersion".to_string(),
                json!("stale"),
            )]),
            ..Default::default()
        };
        let ops = platform_ops_for(&platform, Os::Linux);
        let settings = RuntimeSettings::from_ops(platform.runtime_version.clone(), ops);
        assert_eq!(settings.site_config[LINUX_FX_VERSION], json!("DOTNETCORE|3.1"));

        let windows = platform_ops_for(&platform, Os::Windows);
        assert_eq!(windows.len(), 1);
    }
}
