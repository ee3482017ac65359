//! Configuration loading and management

mod loader;

pub use crate::types::AppSvcConfig;
pub use loader::{arm_token, HierarchicalConfigLoader, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
