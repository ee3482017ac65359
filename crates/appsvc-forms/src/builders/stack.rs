//! Runtime stack editor of the general settings page

use super::FormBuilder;
use crate::plan::{ResourceUpdateRequest, UpdatePlan, UpdateStage, UpdateTarget};
use crate::validation::{FieldRule, ValidationSchema};
use appsvc_core::types::{FieldError, FieldErrorKind};
use appsvc_core::{Error, Result};
use appsvc_gateway::SiteResourceState;
use appsvc_stacks::{ResolvedVersion, RuntimeSettings, StackResolver};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tracing::debug;

/// App setting naming the Functions language worker
const FUNCTIONS_WORKER_RUNTIME: &str = "FUNCTIONS_WORKER_RUNTIME";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSettingsValues {
    pub stack: String,
    pub major_version: String,
    pub minor_version: String,
}

impl From<ResolvedVersion> for StackSettingsValues {
    fn from(resolved: ResolvedVersion) -> Self {
        Self {
            stack: resolved.stack,
            major_version: resolved.major,
            minor_version: resolved.minor,
        }
    }
}

pub struct StackSettingsFormBuilder {
    resolver: StackResolver,
}

impl StackSettingsFormBuilder {
    pub fn new(resolver: StackResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &StackResolver {
        &self.resolver
    }
}

/// The catalog version a site is configured with
pub(crate) fn detected_runtime(resolver: &StackResolver, state: &SiteResourceState) -> Option<ResolvedVersion> {
    resolver.detect_current(state.kind, state.os, &state.app_settings, &state.site_config)
}

impl StackSettingsFormBuilder {
    /// The detected runtime, or the version to propose when the catalog does
    /// not recognise the site.
    ///
    /// The proposal comes from the Functions worker runtime when it names a
    /// catalog stack, otherwise from the first stack offered for the OS. It
    /// is never written to the form; the user has to pick it.
    pub fn suggested_runtime(&self, state: &SiteResourceState) -> Result<Option<ResolvedVersion>> {
        let resolver = &self.resolver;
        if let Some(current) = detected_runtime(resolver, state) {
            return Ok(Some(current));
        }

        let preferred = state
            .app_settings
            .get(FUNCTIONS_WORKER_RUNTIME)
            .filter(|runtime| resolver.catalog().stack(state.kind, runtime).is_ok())
            .cloned()
            .or_else(|| {
                resolver
                    .list_stacks(state.kind, state.os, false)
                    .into_iter()
                    .next()
                    .map(|s| s.value)
            });

        match preferred {
            Some(stack) => {
                debug!("No runtime detected on {}, suggesting {}", state.resource_id, stack);
                resolver.default_version(state.kind, &stack, state.os).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl FormBuilder for StackSettingsFormBuilder {
    type Values = StackSettingsValues;

    /// Sites the catalog does not recognise load with empty values
    fn generate_form_data(&self, state: &SiteResourceState) -> Result<StackSettingsValues> {
        Ok(detected_runtime(&self.resolver, state)
            .map(StackSettingsValues::from)
            .unwrap_or_default())
    }

    fn generate_validation_schema(&self) -> ValidationSchema {
        ValidationSchema::new()
            .rule(FieldRule::required("stack"))
            .rule(FieldRule::required("majorVersion"))
            .rule(FieldRule::required("minorVersion"))
    }

    /// No stack selected writes nothing. A selected platform that carries no
    /// settings for the OS is rejected as a field error.
    fn to_update_requests(&self, state: &SiteResourceState, values: &StackSettingsValues) -> Result<UpdatePlan> {
        if values.stack.is_empty() {
            return Ok(UpdatePlan::new());
        }
        let platform = self.resolver.resolve_platform(
            state.kind,
            &values.stack,
            &values.major_version,
            &values.minor_version,
            state.os,
        )?;
        let settings = self.resolver.build_runtime_settings_for(platform, state.os);
        let requests = runtime_requests(state, &settings);
        if requests.is_empty() {
            return Err(Error::validation_failed(vec![FieldError::new(
                "minorVersion",
                FieldErrorKind::NotAllowed,
                format!(
                    "{} {} has no settings to write on {}",
                    values.stack, values.minor_version, state.os
                ),
            )]));
        }
        Ok(UpdatePlan::new().stage(UpdateStage::new("runtime settings", requests)))
    }
}

/// App settings PUT and site config PATCH carrying `settings`.
///
/// The app settings resource only supports replacement, so the PUT carries
/// the site's current settings with the runtime keys merged in. Either
/// request is left out when the runtime has nothing to write to it.
pub(crate) fn runtime_requests(state: &SiteResourceState, settings: &RuntimeSettings) -> Vec<ResourceUpdateRequest> {
    let mut app_settings = state.app_settings.clone();
    let mut site_config = Map::new();
    settings.apply_to(&mut app_settings, &mut site_config);

    let mut requests = Vec::new();
    if !settings.app_settings.is_empty() {
        requests.push(ResourceUpdateRequest::put(
            UpdateTarget::AppSettings,
            state.app_settings_id(),
            json!({ "properties": app_settings }),
        ));
    }
    if !site_config.is_empty() {
        requests.push(ResourceUpdateRequest::patch(
            UpdateTarget::SiteConfig,
            state.site_config_id(),
            json!({ "properties": site_config }),
        ));
    }
    requests
}
