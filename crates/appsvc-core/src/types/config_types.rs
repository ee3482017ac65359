//! Configuration file types
//!
//! Every section is optional in the user file; missing keys keep the
//! embedded defaults.

use serde::{Deserialize, Serialize};

/// Complete appsvc configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppSvcConfig {
    /// Azure Resource Manager connection settings
    #[serde(default)]
    pub arm: ArmConfig,

    /// Stack catalog selection
    #[serde(default)]
    pub stacks: StacksConfig,

    /// Portal metadata server
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// Azure Resource Manager connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArmConfig {
    /// Base URL, without a trailing slash
    #[serde(default = "default_arm_endpoint")]
    pub endpoint: String,

    /// `api-version` query parameter for site resources
    #[serde(default = "default_arm_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_arm_endpoint(),
            api_version: default_arm_api_version(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Stack catalog selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StacksConfig {
    /// Catalog revision used when a command does not name one
    #[serde(default = "default_stacks_api_version")]
    pub api_version: String,

    /// Directory laid out as `<kind>/<api-version>/*.json` replacing the
    /// bundled catalog
    #[serde(default)]
    pub catalog_dir: Option<String>,
}

impl Default for StacksConfig {
    fn default() -> Self {
        Self {
            api_version: default_stacks_api_version(),
            catalog_dir: None,
        }
    }
}

/// Portal metadata server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataConfig {
    /// Base URL serving `/stacks/{kind}` and `/api/bindingconfig`
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_arm_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_arm_api_version() -> String {
    "2019-08-01".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("appsvc/{}", env!("CARGO_PKG_VERSION"))
}

fn default_stacks_api_version() -> String {
    "2020-06-01".to_string()
}
