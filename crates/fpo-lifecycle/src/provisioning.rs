//! Provisioning orchestrator.
//!
//! Drives the ordered external setup sequence for a verified
//! organization: create the organization, create the CEO identity,
//! install the default role catalog. Each completed step is committed to
//! `setup_progress` before the next one starts, so a retry resumes at the
//! first incomplete step instead of repeating side effects.
//!
//! Transient failures (timeouts, outages) are retried with exponential
//! backoff; rejections surface immediately as a failed step.

use std::time::Duration;

use chrono::Utc;
use fpo_core::access::{AccessControlService, ExternalError, UserProfile};
use fpo_core::error::FpoError;
use fpo_core::models::organization::{LifecycleUpdate, OrganizationRecord, SetupStep};
use fpo_core::repository::OrganizationRepository;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;

/// Re-reads allowed when saving step progress races another writer.
const PROGRESS_SAVE_RETRIES: u32 = 3;

/// Result of one provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SetupOutcome {
    Succeeded,
    Failed { step: SetupStep, cause: String },
}

impl SetupOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SetupOutcome::Succeeded)
    }
}

/// A finished attempt and the record as it stands afterwards.
#[derive(Debug, Clone)]
pub struct SetupRun {
    pub record: OrganizationRecord,
    pub outcome: SetupOutcome,
}

impl SetupRun {
    /// Provisioning bookkeeping the controller commits with the final
    /// status: a failed attempt counts towards the retry limit.
    pub fn bookkeeping(&self) -> LifecycleUpdate {
        match self.outcome {
            SetupOutcome::Succeeded => LifecycleUpdate::default(),
            SetupOutcome::Failed { .. } => LifecycleUpdate {
                setup_attempts: Some(self.record.setup_attempts.saturating_add(1)),
                ..Default::default()
            },
        }
    }
}

/// Executes provisioning against the external access-control service.
#[derive(Clone)]
pub struct ProvisioningOrchestrator<O, X> {
    orgs: O,
    access: X,
    config: LifecycleConfig,
}

impl<O, X> ProvisioningOrchestrator<O, X>
where
    O: OrganizationRepository,
    X: AccessControlService,
{
    pub fn new(orgs: O, access: X, config: LifecycleConfig) -> Self {
        Self {
            orgs,
            access,
            config,
        }
    }

    /// Re-run provisioning after a failed attempt.
    ///
    /// Refused with `RetryExhausted` once `setup_attempts` has reached the
    /// configured maximum. Archiving or escalating is left to the caller.
    pub async fn retry_setup(
        &self,
        record: OrganizationRecord,
        step_timeout: Duration,
    ) -> Result<SetupRun, LifecycleError> {
        self.ensure_retry_allowed(&record)?;
        self.run_setup(record, step_timeout).await
    }

    pub fn ensure_retry_allowed(&self, record: &OrganizationRecord) -> Result<(), LifecycleError> {
        if record.setup_attempts >= self.config.max_setup_attempts {
            return Err(LifecycleError::RetryExhausted {
                attempts: record.setup_attempts,
                max: self.config.max_setup_attempts,
            });
        }
        Ok(())
    }

    /// Run every incomplete step in order.
    ///
    /// The attempt is first claimed by committing `last_setup_at` under the
    /// record's version, so two concurrent callers cannot both reach the
    /// external service. Storage failures are returned as errors; external
    /// failures become [`SetupOutcome::Failed`].
    pub async fn run_setup(
        &self,
        record: OrganizationRecord,
        step_timeout: Duration,
    ) -> Result<SetupRun, LifecycleError> {
        let org_id = record.id;
        let mut record = self
            .orgs
            .commit(
                org_id,
                record.version,
                LifecycleUpdate {
                    last_setup_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| LifecycleError::from_store(e, org_id))?;

        info!(
            org_id = %org_id,
            attempt = record.setup_attempts + 1,
            pending = ?record.setup_progress.next_pending(),
            "Starting provisioning"
        );

        for step in SetupStep::ORDER {
            if record.setup_progress.is_done(step) {
                debug!(org_id = %org_id, step = %step, "Step already complete, skipping");
                continue;
            }

            let update = match self.execute_step(step, &record, step_timeout).await {
                Ok(update) => update,
                Err(err) => {
                    warn!(org_id = %org_id, step = %step, error = %err, "Provisioning step failed");
                    return Ok(SetupRun {
                        record,
                        outcome: SetupOutcome::Failed {
                            step,
                            cause: err.to_string(),
                        },
                    });
                }
            };

            record = self.save_progress(&record, step, update).await?;

            debug!(org_id = %org_id, step = %step, "Step complete");
        }

        info!(org_id = %org_id, "Provisioning complete");
        Ok(SetupRun {
            record,
            outcome: SetupOutcome::Succeeded,
        })
    }

    /// Commit the progress of a completed step.
    ///
    /// The external side effect has already happened, so a version conflict
    /// does not discard it: the record is re-read and the step is marked
    /// done on top of whatever the other writer committed.
    async fn save_progress(
        &self,
        record: &OrganizationRecord,
        step: SetupStep,
        mut update: LifecycleUpdate,
    ) -> Result<OrganizationRecord, LifecycleError> {
        let org_id = record.id;
        let mut version = record.version;
        let mut conflicts = 0u32;

        loop {
            let err = match self.orgs.commit(org_id, version, update.clone()).await {
                Ok(saved) => return Ok(saved),
                Err(err) => err,
            };

            if matches!(err, FpoError::ConcurrentModification { .. })
                && conflicts < PROGRESS_SAVE_RETRIES
            {
                conflicts += 1;
                let fresh = self.orgs.get_by_id(org_id).await.map_err(|e| {
                    progress_lost(org_id, step, &e);
                    LifecycleError::from_store(e, org_id)
                })?;
                warn!(
                    org_id = %org_id,
                    step = %step,
                    expected_version = version,
                    current_version = fresh.version,
                    "Record changed during provisioning, reapplying step progress"
                );
                let mut progress = fresh.setup_progress.clone();
                progress.mark_done(step);
                update.setup_progress = Some(progress);
                version = fresh.version;
                continue;
            }

            progress_lost(org_id, step, &err);
            return Err(LifecycleError::from_store(err, org_id));
        }
    }

    /// Perform one external step and return the progress to persist.
    async fn execute_step(
        &self,
        step: SetupStep,
        record: &OrganizationRecord,
        step_timeout: Duration,
    ) -> Result<LifecycleUpdate, ExternalError> {
        let mut progress = record.setup_progress.clone();
        progress.mark_done(step);

        match step {
            SetupStep::OrgCreated => {
                let metadata = external_metadata(record);
                let external_ref = self
                    .call_with_retry(step, step_timeout, || {
                        self.access.create_organization(&record.name, &metadata)
                    })
                    .await?;
                Ok(LifecycleUpdate {
                    setup_progress: Some(progress),
                    external_org_ref: Some(external_ref),
                    ..Default::default()
                })
            }
            SetupStep::CeoCreated => {
                let profile = UserProfile {
                    external_org_ref: require_external_ref(record)?.to_string(),
                    name: record.ceo.name.clone(),
                    email: record.ceo.email.clone(),
                    phone: record.ceo.phone.clone(),
                    role: self.config.ceo_role.clone(),
                };
                let user_ref = self
                    .call_with_retry(step, step_timeout, || self.access.create_user(&profile))
                    .await?;
                Ok(LifecycleUpdate {
                    setup_progress: Some(progress),
                    ceo_user_id: Some(user_ref),
                    ..Default::default()
                })
            }
            SetupStep::RolesAssigned => {
                let external_ref = require_external_ref(record)?;
                self.call_with_retry(step, step_timeout, || {
                    self.access.assign_default_roles(external_ref)
                })
                .await?;
                Ok(LifecycleUpdate {
                    setup_progress: Some(progress),
                    ..Default::default()
                })
            }
        }
    }

    /// Call `op` under `step_timeout`, retrying transient failures.
    async fn call_with_retry<T, F, Fut>(
        &self,
        step: SetupStep,
        step_timeout: Duration,
        mut op: F,
    ) -> Result<T, ExternalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(step_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ExternalError::Timeout),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt <= self.config.transport_retries => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        step = %step,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient provisioning failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn progress_lost(org_id: Uuid, step: SetupStep, err: &FpoError) {
    error!(
        org_id = %org_id,
        step = %step,
        error = %err,
        reconciliation_required = true,
        "External step succeeded but progress could not be saved"
    );
}

fn require_external_ref(record: &OrganizationRecord) -> Result<&str, ExternalError> {
    record.external_org_ref.as_deref().ok_or_else(|| {
        ExternalError::Unexpected("external organization reference missing".into())
    })
}

/// Metadata sent with the create-organization call.
fn external_metadata(record: &OrganizationRecord) -> serde_json::Value {
    let mut metadata = match &record.metadata {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    metadata.insert("fpo_id".into(), record.id.to_string().into());
    metadata.insert(
        "registration_number".into(),
        record.registration_number.clone().into(),
    );
    if let Some(parent) = record.parent_fpo_id {
        metadata.insert("parent_fpo_id".into(), parent.to_string().into());
    }
    serde_json::Value::Object(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serializes_with_step_name() {
        let outcome = SetupOutcome::Failed {
            step: SetupStep::CeoCreated,
            cause: "rejected by external service: duplicate email".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["step"], "ceo_created");
        assert_eq!(
            serde_json::to_value(SetupOutcome::Succeeded).unwrap()["outcome"],
            "succeeded"
        );
    }
}
