//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (~/.appsvc/config.yaml, or an explicit path)
//! 3. Environment variables (APPSVC_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::AppSvcConfig;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Directory under the home directory holding user configuration
pub const CONFIG_DIR_NAME: &str = ".appsvc";

/// User configuration file name
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULTS_FILE: &str = "defaults.yaml";

/// Bearer token for ARM requests. Read from the environment only.
pub fn arm_token() -> Option<String> {
    env::var("APPSVC_ARM_TOKEN").ok().filter(|t| !t.is_empty())
}

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at ~/.appsvc
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|_| Error::invalid_config("Home directory path is not valid UTF-8"))?;
        Ok(Self {
            config_dir: home.join(CONFIG_DIR_NAME),
        })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Load configuration from the config directory
    pub fn load(&self) -> Result<AppSvcConfig> {
        let user_path = self.config_dir.join(CONFIG_FILE_NAME);
        let user_path = user_path.exists().then_some(user_path);
        self.load_layers(user_path.as_deref())
    }

    /// Load configuration using an explicit user file, which must exist
    pub fn load_from(&self, path: &Utf8Path) -> Result<AppSvcConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }
        self.load_layers(Some(path))
    }

    fn load_layers(&self, user_file: Option<&Utf8Path>) -> Result<AppSvcConfig> {
        let mut merged = Self::load_embedded_defaults()?;

        if let Some(path) = user_file {
            debug!("Loading user config from {}", path);
            let overlay = Self::load_yaml_file(path)?;
            merge_values(&mut merged, overlay);
        }

        let config: AppSvcConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Failed to parse configuration: {}", e)))?;

        Self::apply_env_overrides(config)
    }

    fn load_embedded_defaults() -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(DEFAULTS_FILE).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", DEFAULTS_FILE))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", DEFAULTS_FILE))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                DEFAULTS_FILE, e
            ))
        })
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        // An empty file parses as null
        Ok(if value.is_null() {
            Value::Mapping(Default::default())
        } else {
            value
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: AppSvcConfig) -> Result<AppSvcConfig> {
        if let Ok(val) = env::var("APPSVC_ARM_ENDPOINT") {
            config.arm.endpoint = val.trim_end_matches('/').to_string();
        }

        if let Ok(val) = env::var("APPSVC_ARM_API_VERSION") {
            config.arm.api_version = val;
        }

        if let Ok(val) = env::var("APPSVC_HTTP_TIMEOUT_SECS") {
            config.arm.timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("APPSVC_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("APPSVC_STACKS_API_VERSION") {
            config.stacks.api_version = val;
        }

        if let Ok(val) = env::var("APPSVC_STACKS_CATALOG_DIR") {
            config.stacks.catalog_dir = Some(val).filter(|v| !v.is_empty());
        }

        if let Ok(val) = env::var("APPSVC_METADATA_ENDPOINT") {
            config.metadata.endpoint = Some(val).filter(|v| !v.is_empty());
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Recursively merge `overlay` into `base`; mappings merge key by key,
/// anything else in the overlay replaces the base value.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
