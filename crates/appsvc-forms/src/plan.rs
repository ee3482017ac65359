//! Resource update plans
//!
//! A plan is an ordered list of stages. Requests inside a stage are
//! independent and go out concurrently; stages run one after another.

use appsvc_gateway::SiteResourceState;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Logical resource a request writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateTarget {
    AppSettings,
    SiteConfig,
    SourceControl,
    PublishingUser,
    RegistryWebhook,
}

impl UpdateTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppSettings => "appsettings",
            Self::SiteConfig => "siteconfig",
            Self::SourceControl => "sourcecontrol",
            Self::PublishingUser => "publishinguser",
            Self::RegistryWebhook => "acrwebhook",
        }
    }
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateMethod {
    Put,
    Patch,
    Post,
    Delete,
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One request against one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdateRequest {
    pub target: UpdateTarget,
    pub method: UpdateMethod,
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ResourceUpdateRequest {
    pub fn put(target: UpdateTarget, resource_id: impl Into<String>, body: Value) -> Self {
        Self {
            target,
            method: UpdateMethod::Put,
            resource_id: resource_id.into(),
            body: Some(body),
        }
    }

    pub fn patch(target: UpdateTarget, resource_id: impl Into<String>, body: Value) -> Self {
        Self {
            target,
            method: UpdateMethod::Patch,
            resource_id: resource_id.into(),
            body: Some(body),
        }
    }

    pub fn delete(target: UpdateTarget, resource_id: impl Into<String>) -> Self {
        Self {
            target,
            method: UpdateMethod::Delete,
            resource_id: resource_id.into(),
            body: None,
        }
    }

    /// The `properties` object of the body, or the body itself
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        let body = self.body.as_ref()?;
        body.get("properties").unwrap_or(body).as_object()
    }

    /// Top-level property keys this request would change, sorted.
    ///
    /// A PUT replaces the whole property bag, so keys present in `current`
    /// but missing from the body count as changes too.
    pub fn diff(&self, current: &Map<String, Value>) -> Vec<String> {
        let mut changed = BTreeSet::new();
        match self.method {
            UpdateMethod::Delete => changed.extend(current.keys().cloned()),
            _ => {
                let empty = Map::new();
                let properties = self.properties().unwrap_or(&empty);
                for (key, value) in properties {
                    if current.get(key) != Some(value) {
                        changed.insert(key.clone());
                    }
                }
                if self.method == UpdateMethod::Put {
                    changed.extend(current.keys().filter(|k| !properties.contains_key(*k)).cloned());
                }
            }
        }
        changed.into_iter().collect()
    }

    /// [`diff`](Self::diff) against the matching part of a loaded site.
    ///
    /// Targets the site state does not track are compared against an empty
    /// object.
    pub fn diff_against(&self, state: &SiteResourceState) -> Vec<String> {
        self.diff(&current_properties(state, self.target))
    }
}

fn current_properties(state: &SiteResourceState, target: UpdateTarget) -> Map<String, Value> {
    match target {
        UpdateTarget::AppSettings => state
            .app_settings
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
        UpdateTarget::SiteConfig => state.site_config.clone(),
        UpdateTarget::SourceControl => state
            .source_control
            .as_ref()
            .and_then(|sc| serde_json::to_value(sc).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default(),
        UpdateTarget::PublishingUser | UpdateTarget::RegistryWebhook => Map::new(),
    }
}

/// Condition for running a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageGate {
    Always,
    /// Every earlier stage that is not best-effort succeeded
    PreviousSucceeded,
}

/// Requests that may be issued together
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStage {
    pub name: String,
    pub gate: StageGate,
    /// Failures are logged but do not fail the submission
    pub best_effort: bool,
    pub requests: Vec<ResourceUpdateRequest>,
}

impl UpdateStage {
    pub fn new(name: impl Into<String>, requests: Vec<ResourceUpdateRequest>) -> Self {
        Self {
            name: name.into(),
            gate: StageGate::Always,
            best_effort: false,
            requests,
        }
    }

    pub fn after_previous(mut self) -> Self {
        self.gate = StageGate::PreviousSucceeded;
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdatePlan {
    stages: Vec<UpdateStage>,
}

impl UpdatePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages without requests are dropped
    pub fn stage(mut self, stage: UpdateStage) -> Self {
        self.push(stage);
        self
    }

    pub fn push(&mut self, stage: UpdateStage) {
        if !stage.requests.is_empty() {
            self.stages.push(stage);
        }
    }

    pub fn stages(&self) -> &[UpdateStage] {
        &self.stages
    }

    pub fn requests(&self) -> impl Iterator<Item = &ResourceUpdateRequest> {
        self.stages.iter().flat_map(|s| s.requests.iter())
    }

    pub fn request_for(&self, target: UpdateTarget) -> Option<&ResourceUpdateRequest> {
        self.requests().find(|r| r.target == target)
    }

    pub fn len(&self) -> usize {
        self.requests().count()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether no request would change the loaded site
    pub fn is_noop_against(&self, state: &SiteResourceState) -> bool {
        self.requests().all(|r| r.diff_against(state).is_empty())
    }
}
