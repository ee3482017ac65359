//! Issues update plans through a resource gateway

use crate::plan::{ResourceUpdateRequest, StageGate, UpdateMethod, UpdatePlan, UpdateTarget};
use appsvc_core::{Error, RequestFailure, Result, SkippedRequest};
use appsvc_gateway::{GatewayError, GatewayResponse, ResourceGateway};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of one issued request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub target: UpdateTarget,
    pub resource_id: String,
    pub best_effort: bool,
    pub error: Option<GatewayError>,
}

impl RequestOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything that happened during one submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    /// Issued requests, in plan order
    pub results: Vec<RequestOutcome>,
    /// Requests not issued because an earlier stage failed
    pub skipped: Vec<ResourceUpdateRequest>,
}

impl SubmissionOutcome {
    /// Successful requests that count towards the result
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.best_effort && r.succeeded())
            .count()
    }

    /// Failed requests that count towards the result, in plan order
    pub fn failures(&self) -> Vec<RequestFailure> {
        self.results
            .iter()
            .filter(|r| !r.best_effort)
            .filter_map(|r| {
                r.error
                    .as_ref()
                    .map(|e| RequestFailure::new(r.target.as_str(), &r.resource_id, e.to_string()))
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    /// Requests left out because a stage they were gated on failed
    pub fn skipped_requests(&self) -> Vec<SkippedRequest> {
        self.skipped
            .iter()
            .map(|r| SkippedRequest::new(r.target.as_str(), &r.resource_id))
            .collect()
    }

    /// `UpstreamRequestFailed` when the only request of the submission
    /// failed, `PartialUpdateFailure` listing failed and skipped requests
    /// otherwise
    pub fn into_result(self) -> Result<Self> {
        let mut failures = self.failures();
        let succeeded = self.succeeded();
        let skipped = self.skipped_requests();
        match failures.len() {
            0 => Ok(self),
            1 if succeeded == 0 && skipped.is_empty() => {
                let failure = failures.remove(0);
                Err(Error::upstream(failure.target, failure.message))
            }
            _ => Err(Error::PartialUpdateFailure {
                succeeded,
                failures,
                skipped,
            }),
        }
    }
}

/// Runs plans stage by stage
#[derive(Clone)]
pub struct UpdateExecutor {
    gateway: Arc<dyn ResourceGateway>,
}

impl UpdateExecutor {
    pub fn new(gateway: Arc<dyn ResourceGateway>) -> Self {
        Self { gateway }
    }

    /// Issue every stage of `plan`.
    ///
    /// Requests of a stage are joined before the next stage starts. A failed
    /// request never stops its siblings; it only skips later stages gated on
    /// [`StageGate::PreviousSucceeded`]. Nothing is rolled back.
    pub async fn submit(&self, plan: &UpdatePlan) -> SubmissionOutcome {
        let mut outcome = SubmissionOutcome::default();
        let mut all_succeeded = true;

        for stage in plan.stages() {
            if stage.gate == StageGate::PreviousSucceeded && !all_succeeded {
                warn!(
                    "Skipping stage '{}' ({} requests): an earlier stage failed",
                    stage.name,
                    stage.requests.len()
                );
                outcome.skipped.extend(stage.requests.iter().cloned());
                continue;
            }

            debug!("Running stage '{}' with {} requests", stage.name, stage.requests.len());
            let responses = join_all(stage.requests.iter().map(|r| self.issue(r))).await;

            for (request, response) in stage.requests.iter().zip(responses) {
                if !response.success {
                    let message = response.error_message();
                    if stage.best_effort {
                        warn!(
                            target_resource = %request.resource_id,
                            "{} {} failed (ignored): {}",
                            request.method,
                            request.target,
                            message
                        );
                    } else {
                        error!(
                            target_resource = %request.resource_id,
                            "{} {} failed: {}",
                            request.method,
                            request.target,
                            message
                        );
                        all_succeeded = false;
                    }
                }
                outcome.results.push(RequestOutcome {
                    target: request.target,
                    resource_id: request.resource_id.clone(),
                    best_effort: stage.best_effort,
                    error: response.error.or_else(|| {
                        (!response.success).then(|| GatewayError::new("request failed"))
                    }),
                });
            }
        }

        info!(
            "Submitted {} requests: {} succeeded, {} failed, {} skipped",
            outcome.results.len(),
            outcome.results.iter().filter(|r| r.succeeded()).count(),
            outcome.results.iter().filter(|r| !r.succeeded()).count(),
            outcome.skipped.len()
        );
        outcome
    }

    async fn issue(&self, request: &ResourceUpdateRequest) -> GatewayResponse<Value> {
        let body = request.body.as_ref();
        let null = Value::Null;
        match request.method {
            UpdateMethod::Put => self.gateway.put(&request.resource_id, body.unwrap_or(&null)).await,
            UpdateMethod::Patch => self.gateway.patch(&request.resource_id, body.unwrap_or(&null)).await,
            UpdateMethod::Post => self.gateway.post(&request.resource_id, body).await,
            UpdateMethod::Delete => self.gateway.delete(&request.resource_id).await,
        }
    }
}
