//! # appsvc-stacks
//!
//! The runtime stack catalog and the pure query functions over it.
//!
//! A [`CatalogRegistry`] holds every catalog revision keyed by API version.
//! Each [`StackCatalog`] revision is immutable once built and is shared with
//! [`StackResolver`] instances through an `Arc`.

pub mod bindings;
pub mod catalog;
mod document;
pub mod model;
pub mod resolver;
pub mod settings;
pub mod version;

pub use bindings::{
    BindingConfigDefinition, BindingConfigMetadata, BindingDirection, BindingSettingResource,
    BindingSettingValue, BindingsConfig,
};
pub use catalog::{CatalogRegistry, StackCatalog, LEGACY_API_VERSION};
pub use model::{
    AppInsightsSettings, GitHubActionSettings, MajorVersion, MinorVersion, PlatformMap,
    PlatformSettings, StackDefinition,
};
pub use resolver::{ResolvedVersion, StackQuery, StackResolver};
pub use settings::{RuntimeSettings, SettingOp};
