//! # appsvc-forms
//!
//! Turns live site state into form values, validates edited values against a
//! declarative schema, and maps them back into staged ARM update requests.
//!
//! - [`FormBuilder`] is implemented once per editor
//! - [`EditingSession`] drives the `Loading → Ready → Submitting` lifecycle
//! - [`UpdateExecutor`] issues an [`UpdatePlan`] through a resource gateway

pub mod bindings;
pub mod builders;
pub mod executor;
pub mod plan;
pub mod session;
pub mod validation;

pub use bindings::{binding_validation_schema, filter_app_settings, setting_name_from_option};
pub use builders::{
    BuildProvider, CodeFormBuilder, CodeFormValues, ContainerFormBuilder, ContainerFormValues,
    ContainerOption, DeploymentSource, FormBuilder, RegistrySource, SourceProvider,
    StackSettingsFormBuilder, StackSettingsValues,
};
pub use executor::{RequestOutcome, SubmissionOutcome, UpdateExecutor};
pub use plan::{ResourceUpdateRequest, StageGate, UpdateMethod, UpdatePlan, UpdateStage, UpdateTarget};
pub use session::{EditingSession, SessionState};
pub use validation::{Check, Condition, FieldRule, Requirement, ValidationSchema};
