//! Editing session lifecycle
//!
//! ```text
//! Loading → Ready → Submitting → Succeeded
//!             ↑          ↓
//!             └──── Failed
//! ```
//!
//! A failed submit keeps the entered values. The next edit or submit moves
//! the session from `Failed` back to `Ready`.

use crate::builders::FormBuilder;
use crate::executor::{SubmissionOutcome, UpdateExecutor};
use crate::plan::UpdatePlan;
use crate::validation::ValidationSchema;
use appsvc_core::{Error, FieldError, Result};
use appsvc_gateway::SiteResourceState;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Loading,
    Ready,
    Submitting,
    Succeeded,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One user editing one resource with one form
pub struct EditingSession<B: FormBuilder> {
    builder: B,
    schema: ValidationSchema,
    state: SessionState,
    resource: Option<SiteResourceState>,
    initial: Option<B::Values>,
    values: Option<B::Values>,
    field_errors: Vec<FieldError>,
    last_error: Option<String>,
}

impl<B: FormBuilder> EditingSession<B> {
    pub fn new(builder: B) -> Self {
        let schema = builder.generate_validation_schema();
        Self {
            builder,
            schema,
            state: SessionState::Loading,
            resource: None,
            initial: None,
            values: None,
            field_errors: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn schema(&self) -> &ValidationSchema {
        &self.schema
    }

    pub fn resource(&self) -> Option<&SiteResourceState> {
        self.resource.as_ref()
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Message of the last failed submit
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Project live resource state into form values and become `Ready`
    pub fn load(&mut self, resource: SiteResourceState) -> Result<()> {
        if self.state == SessionState::Submitting {
            return Err(Error::invalid_session_state("load", self.state));
        }
        let values = self.builder.generate_form_data(&resource)?;
        self.initial = Some(values.clone());
        self.values = Some(values);
        self.resource = Some(resource);
        self.field_errors.clear();
        self.last_error = None;
        self.transition(SessionState::Ready);
        Ok(())
    }

    pub fn values(&self) -> Result<&B::Values> {
        self.values
            .as_ref()
            .ok_or_else(|| Error::invalid_session_state("read values", self.state))
    }

    /// Whether the values differ from what was loaded or last submitted
    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Change the form values in place
    pub fn edit(&mut self, f: impl FnOnce(&mut B::Values)) -> Result<()> {
        self.ensure_editable("edit")?;
        let values = self
            .values
            .as_mut()
            .ok_or_else(|| Error::invalid_session_state("edit", SessionState::Loading))?;
        f(values);
        self.transition(SessionState::Ready);
        Ok(())
    }

    pub fn replace_values(&mut self, values: B::Values) -> Result<()> {
        self.edit(|current| *current = values)
    }

    /// Field errors of the current values
    pub fn validate(&self) -> Result<Vec<FieldError>> {
        let values = serde_json::to_value(self.values()?)?;
        Ok(self.schema.validate(&values))
    }

    /// Validate and build the update plan without issuing it
    pub fn plan(&self) -> Result<UpdatePlan> {
        let resource = self
            .resource
            .as_ref()
            .ok_or_else(|| Error::invalid_session_state("plan", self.state))?;
        let values = self.values()?;
        self.schema.ensure_valid(&serde_json::to_value(values)?)?;
        self.builder.to_update_requests(resource, values)
    }

    /// Validate, plan and issue the current values.
    ///
    /// Validation and planning errors leave the session `Ready`. Upstream
    /// failures move it to `Failed` with the values retained.
    pub async fn submit(&mut self, executor: &UpdateExecutor) -> Result<SubmissionOutcome> {
        self.ensure_editable("submit")?;
        self.transition(SessionState::Ready);

        let plan = match self.plan() {
            Ok(plan) => {
                self.field_errors.clear();
                plan
            }
            Err(e) => {
                self.field_errors = e.field_errors().to_vec();
                return Err(e);
            }
        };

        self.transition(SessionState::Submitting);
        match executor.submit(&plan).await.into_result() {
            Ok(outcome) => {
                self.initial = self.values.clone();
                self.last_error = None;
                self.transition(SessionState::Succeeded);
                Ok(outcome)
            }
            Err(e) => {
                error!("Submission failed: {}", e);
                self.last_error = Some(e.to_string());
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    fn ensure_editable(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Ready | SessionState::Succeeded | SessionState::Failed => Ok(()),
            SessionState::Loading | SessionState::Submitting => {
                Err(Error::invalid_session_state(operation, self.state))
            }
        }
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            debug!("Session {} -> {}", self.state, to);
            self.state = to;
        }
    }
}
