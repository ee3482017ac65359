//! # appsvc-core
//!
//! Core library shared by the appsvc crates:
//! - Platform and app-kind types used as catalog constraints
//! - The error taxonomy surfaced to editing sessions
//! - JSON Schema validation of catalog and metadata documents
//! - Hierarchical configuration loading (embedded defaults, user file, env)

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{AppSvcConfig, HierarchicalConfigLoader};
pub use error::{Error, Result};
pub use schema::SchemaValidator;
pub use types::{AppKind, FieldError, Os, RequestFailure, SkippedRequest};
