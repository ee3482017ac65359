//! # appsvc-gateway
//!
//! Performs the authenticated HTTP calls the editing core needs issued.
//!
//! Every call through [`ResourceGateway`] returns a [`GatewayResponse`]
//! envelope with an explicit success flag instead of an `Err`, so callers
//! can inspect and aggregate the outcome of several requests.

pub mod arm;
pub mod envelope;
pub mod keys;
pub mod metadata;
pub mod site;
pub mod traits;

pub use arm::ArmClient;
pub use envelope::{GatewayError, GatewayResponse};
pub use keys::{FunctionKey, FunctionKeys, HostKeys};
pub use metadata::MetadataClient;
pub use site::{PublishingCredentials, SiteResourceState, SourceControlInfo};
pub use traits::ResourceGateway;
