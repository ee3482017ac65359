//! Concrete form builders

mod code;
mod container;
mod stack;

pub use code::{BuildProvider, CodeFormBuilder, CodeFormValues, SourceProvider};
pub use container::{
    ContainerFormBuilder, ContainerFormValues, ContainerOption, DeploymentSource, RegistrySource,
};
pub use stack::{StackSettingsFormBuilder, StackSettingsValues};

use crate::plan::UpdatePlan;
use crate::validation::ValidationSchema;
use appsvc_core::Result;
use appsvc_gateway::SiteResourceState;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Maps site state to form values and form values to update requests
pub trait FormBuilder {
    type Values: Serialize + DeserializeOwned + Clone + PartialEq + Send;

    /// Initial values for `state`, with catalog defaults where the site has none
    fn generate_form_data(&self, state: &SiteResourceState) -> Result<Self::Values>;

    fn generate_validation_schema(&self) -> ValidationSchema;

    /// Requests that write `values` to the site. Values are expected to have
    /// passed the validation schema.
    fn to_update_requests(&self, state: &SiteResourceState, values: &Self::Values) -> Result<UpdatePlan>;
}
