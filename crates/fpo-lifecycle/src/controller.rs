//! Lifecycle controller: the single entry point for status changes.
//!
//! Every request runs the same pipeline: load the record, check the
//! actor's permission, validate the transition, provision if the target
//! is `PENDING_SETUP`, commit under the version that was read, append the
//! audit entry. The commit and the audit write run in a spawned task so
//! that dropping the caller's future cannot separate them.

use std::time::Duration;

use chrono::Utc;
use fpo_core::access::{
    AccessControlService, ExternalError, FPO_RESOURCE, PermissionChecker,
};
use fpo_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use fpo_core::models::organization::{
    CreateOrganization, LifecycleAction, LifecycleUpdate, OrgStatus, OrganizationRecord,
    VerificationStatus,
};
use fpo_core::repository::{
    AuditLogRepository, OrganizationRepository, PaginatedResult, Pagination,
};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, TransitionFailure};
use crate::ledger::{AuditContext, AuditLedger};
use crate::provisioning::{ProvisioningOrchestrator, SetupOutcome, SetupRun};
use crate::transition;

const REGISTER: &str = "register";
const OVERRIDE_SETUP_LIMIT: &str = "override-setup-limit";
const ERASE: &str = "erase";

/// A requested lifecycle action.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub org_id: Uuid,
    pub action: LifecycleAction,
    pub actor_id: Uuid,
    pub reason: Option<String>,
    pub request_id: String,
    /// Overrides the configured permission-check and provisioning-step
    /// deadlines for this request.
    pub timeout: Option<Duration>,
}

impl TransitionRequest {
    pub fn new(
        org_id: Uuid,
        action: LifecycleAction,
        actor_id: Uuid,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id,
            action,
            actor_id,
            reason: None,
            request_id: request_id.into(),
            timeout: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn audit_context(&self) -> AuditContext {
        AuditContext {
            organization_id: self.org_id,
            action: self.action.as_str().to_string(),
            actor_id: self.actor_id,
            reason: self.reason.clone(),
            request_id: self.request_id.clone(),
        }
    }
}

/// A committed transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The record as committed.
    pub record: OrganizationRecord,
    pub previous_status: OrgStatus,
    /// Present when the transition ran provisioning. A failed setup is a
    /// committed `SETUP_FAILED` transition, not an error.
    pub setup: Option<SetupOutcome>,
}

/// Result of the spawned commit-and-audit section.
type Committed = Result<(OrganizationRecord, Result<AuditLogEntry, String>), LifecycleError>;

/// Orchestrates lifecycle transitions for organization records.
///
/// Generic over the repositories and external capabilities so that the
/// lifecycle layer has no dependency on the database or HTTP crates.
pub struct LifecycleController<O, A, P, X>
where
    O: OrganizationRepository,
    A: AuditLogRepository,
{
    orgs: O,
    ledger: AuditLedger<A>,
    permissions: P,
    orchestrator: ProvisioningOrchestrator<O, X>,
    config: LifecycleConfig,
}

impl<O, A, P, X> LifecycleController<O, A, P, X>
where
    O: OrganizationRepository + Clone + 'static,
    A: AuditLogRepository + Clone + 'static,
    P: PermissionChecker,
    X: AccessControlService,
{
    pub fn new(orgs: O, audit: A, permissions: P, access: X, config: LifecycleConfig) -> Self {
        Self {
            orchestrator: ProvisioningOrchestrator::new(orgs.clone(), access, config.clone()),
            orgs,
            ledger: AuditLedger::new(audit),
            permissions,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Apply `request.action` to the organization.
    pub async fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        let span = info_span!(
            "lifecycle_transition",
            org_id = %request.org_id,
            action = %request.action,
            actor_id = %request.actor_id,
            request_id = %request.request_id,
        );
        self.run_transition(request).instrument(span).await
    }

    async fn run_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        let org_id = request.org_id;
        let record = self.load(org_id).await?;
        let from = record.status;
        let ctx = request.audit_context();

        if let Err(err) = self
            .authorize(request.actor_id, request.action.as_str(), org_id, request.timeout)
            .await
        {
            return Err(self.refuse(&ctx, from, err).await);
        }

        let to = match transition::next_status(from, request.action) {
            Ok(to) => to,
            Err(err) => return Err(self.refuse(&ctx, from, err).await),
        };

        if transition::requires_provisioning(to) {
            return self.provision(&request, &ctx, record).await;
        }

        let now = Utc::now();
        let update = LifecycleUpdate {
            status: Some(to),
            previous_status: Some(from),
            status_reason: Some(request.reason.clone()),
            status_changed_at: Some(now),
            status_changed_by: Some(request.actor_id),
            ..verification_update(request.action, request.actor_id, &request.reason, now)
        };
        let entry = AuditLedger::<A>::success_entry(&ctx, from, to, serde_json::json!({}));

        let record = self
            .commit_and_audit(&ctx, from, record.version, update, entry)
            .await?;

        info!(from = %from, to = %record.status, version = record.version, "Lifecycle transition committed");
        Ok(TransitionOutcome {
            record,
            previous_status: from,
            setup: None,
        })
    }

    /// `begin-setup` / `retry-setup`: run provisioning, then commit the
    /// resulting `ACTIVE` or `SETUP_FAILED` status.
    async fn provision(
        &self,
        request: &TransitionRequest,
        ctx: &AuditContext,
        record: OrganizationRecord,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        let from = record.status;
        let step_timeout = request.timeout.unwrap_or_else(|| self.config.step_timeout());

        let run = if request.action == LifecycleAction::RetrySetup {
            self.orchestrator.retry_setup(record, step_timeout).await
        } else {
            self.orchestrator.run_setup(record, step_timeout).await
        };
        let run = match run {
            Ok(run) => run,
            Err(err) => {
                let status = self.current_status(request.org_id, from, &err).await;
                return Err(self.refuse(ctx, status, err).await);
            }
        };

        let SetupRun { record, outcome } = &run;
        let result_action = match outcome {
            SetupOutcome::Succeeded => LifecycleAction::SetupSucceeded,
            SetupOutcome::Failed { .. } => LifecycleAction::SetupFailed,
        };
        let to = match transition::next_status(OrgStatus::PendingSetup, result_action) {
            Ok(to) => to,
            Err(err) => return Err(self.refuse(ctx, from, err).await),
        };

        let update = LifecycleUpdate {
            status: Some(to),
            previous_status: Some(from),
            status_reason: Some(request.reason.clone()),
            status_changed_at: Some(Utc::now()),
            status_changed_by: Some(request.actor_id),
            ..run.bookkeeping()
        };
        let entry = match outcome {
            SetupOutcome::Succeeded => AuditLedger::<A>::success_entry(
                ctx,
                from,
                to,
                serde_json::json!({ "setup_progress": record.setup_progress.to_json() }),
            ),
            SetupOutcome::Failed { step, cause } => {
                AuditLedger::<A>::setup_failure_entry(ctx, from, to, *step, cause)
            }
        };

        let committed = self
            .commit_and_audit(ctx, from, record.version, update, entry)
            .await?;

        match outcome {
            SetupOutcome::Succeeded => {
                info!(from = %from, to = %committed.status, "Organization provisioned")
            }
            SetupOutcome::Failed { step, .. } => warn!(
                from = %from,
                to = %committed.status,
                step = %step,
                setup_attempts = committed.setup_attempts,
                "Provisioning failed"
            ),
        }

        Ok(TransitionOutcome {
            record: committed,
            previous_status: from,
            setup: Some(run.outcome),
        })
    }

    // -----------------------------------------------------------------------
    // Named operations
    // -----------------------------------------------------------------------

    pub async fn submit(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Submit, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn approve(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Approve, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn reject(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Reject, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn resubmit(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Resubmit, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn begin_setup(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::BeginSetup, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn retry_setup(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::RetrySetup, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn suspend(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Suspend, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn deactivate(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Deactivate, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn reinstate(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Reinstate, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn reactivate(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Reactivate, org_id, actor_id, reason, request_id)
            .await
    }

    pub async fn archive(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        self.named(LifecycleAction::Archive, org_id, actor_id, reason, request_id)
            .await
    }

    async fn named(
        &self,
        action: LifecycleAction,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<TransitionOutcome, TransitionFailure> {
        let mut request = TransitionRequest::new(org_id, action, actor_id, request_id);
        request.reason = reason;
        self.transition(request).await
    }

    // -----------------------------------------------------------------------
    // Registration, overrides and erasure
    // -----------------------------------------------------------------------

    /// Create a `DRAFT` record and record its registration.
    ///
    /// Permission to register is enforced by the routing layer; this only
    /// validates the input.
    pub async fn register(
        &self,
        input: CreateOrganization,
        actor_id: Uuid,
        request_id: impl Into<String>,
    ) -> Result<OrganizationRecord, TransitionFailure> {
        let request_id = request_id.into();
        validate_registration(&input).map_err(|e| TransitionFailure::new(None, e))?;

        if let Some(parent_id) = input.parent_fpo_id {
            match self.orgs.get_by_id(parent_id).await {
                Ok(_) => {}
                Err(fpo_core::FpoError::NotFound { .. }) => {
                    return Err(TransitionFailure::new(
                        None,
                        LifecycleError::Validation(format!(
                            "parent organization {parent_id} does not exist"
                        )),
                    ));
                }
                Err(e) => {
                    return Err(TransitionFailure::new(
                        None,
                        LifecycleError::from_store(e, parent_id),
                    ));
                }
            }
        }

        let orgs = self.orgs.clone();
        let ledger = self.ledger.clone();
        let registration = tokio::spawn(async move {
            let record = orgs.create(input).await?;
            let ctx = AuditContext {
                organization_id: record.id,
                action: REGISTER.to_string(),
                actor_id,
                reason: None,
                request_id,
            };
            let entry = AuditLedger::<A>::success_entry(
                &ctx,
                record.status,
                record.status,
                serde_json::json!({ "registration_number": record.registration_number }),
            );
            let appended = ledger.append(entry).await.map_err(|e| e.to_string());
            Ok::<_, fpo_core::FpoError>((record, appended))
        })
        .await;

        let (record, appended) = match registration {
            Ok(Ok(created)) => created,
            Ok(Err(e)) => {
                return Err(TransitionFailure::new(
                    None,
                    LifecycleError::from_store(e, Uuid::nil()),
                ));
            }
            Err(join) => {
                return Err(TransitionFailure::new(
                    None,
                    LifecycleError::Internal(format!("registration task failed: {join}")),
                ));
            }
        };

        if let Err(message) = appended {
            return Err(ledger_drift(&record, REGISTER, message));
        }

        info!(org_id = %record.id, actor_id = %actor_id, "Organization registered");
        Ok(record)
    }

    /// Reset `setup_attempts` to zero so a `SETUP_FAILED` organization can
    /// be provisioned again. The status is left unchanged.
    pub async fn override_setup_limit(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<OrganizationRecord, TransitionFailure> {
        let ctx = AuditContext {
            organization_id: org_id,
            action: OVERRIDE_SETUP_LIMIT.to_string(),
            actor_id,
            reason,
            request_id: request_id.into(),
        };
        let record = self.load(org_id).await?;
        let status = record.status;

        if let Err(err) = self
            .authorize(actor_id, OVERRIDE_SETUP_LIMIT, org_id, None)
            .await
        {
            return Err(self.refuse(&ctx, status, err).await);
        }
        if status != OrgStatus::SetupFailed {
            let err = LifecycleError::OperationNotAllowed {
                operation: OVERRIDE_SETUP_LIMIT,
                status,
            };
            return Err(self.refuse(&ctx, status, err).await);
        }

        let update = LifecycleUpdate {
            setup_attempts: Some(0),
            ..Default::default()
        };
        let entry = AuditLedger::<A>::success_entry(
            &ctx,
            status,
            status,
            serde_json::json!({ "previous_setup_attempts": record.setup_attempts }),
        );
        let committed = self
            .commit_and_audit(&ctx, status, record.version, update, entry)
            .await?;

        info!(
            org_id = %org_id,
            actor_id = %actor_id,
            previous_setup_attempts = record.setup_attempts,
            "Setup attempt limit overridden"
        );
        Ok(committed)
    }

    /// Compliance erasure. The record disappears from every read path; its
    /// audit history is kept.
    pub async fn erase(
        &self,
        org_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
        request_id: impl Into<String>,
    ) -> Result<(), TransitionFailure> {
        let ctx = AuditContext {
            organization_id: org_id,
            action: ERASE.to_string(),
            actor_id,
            reason,
            request_id: request_id.into(),
        };
        let record = self.load(org_id).await?;
        let status = record.status;

        if let Err(err) = self.authorize(actor_id, ERASE, org_id, None).await {
            return Err(self.refuse(&ctx, status, err).await);
        }

        let orgs = self.orgs.clone();
        let ledger = self.ledger.clone();
        let entry =
            AuditLedger::<A>::success_entry(&ctx, status, status, serde_json::json!({ "erased": true }));
        let version = record.version;
        let erased = tokio::spawn(async move {
            orgs.erase(org_id, version)
                .await
                .map_err(|e| LifecycleError::from_store(e, org_id))?;
            Ok::<_, LifecycleError>(ledger.append(entry).await.map_err(|e| e.to_string()))
        })
        .await
        .map_err(|join| LifecycleError::Internal(format!("erase task failed: {join}")));

        match erased {
            Ok(Ok(Ok(_))) => {
                info!(org_id = %org_id, actor_id = %actor_id, "Organization erased");
                Ok(())
            }
            Ok(Ok(Err(message))) => Err(ledger_drift(&record, ERASE, message)),
            Ok(Err(err)) | Err(err) => {
                let current = self.current_status(org_id, status, &err).await;
                Err(self.refuse(&ctx, current, err).await)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get(&self, org_id: Uuid) -> Result<OrganizationRecord, LifecycleError> {
        self.orgs
            .get_by_id(org_id)
            .await
            .map_err(|e| LifecycleError::from_store(e, org_id))
    }

    /// The organization's audit trail, oldest first.
    pub async fn get_history(
        &self,
        org_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResult<AuditLogEntry>, LifecycleError> {
        self.ledger
            .history(org_id, pagination)
            .await
            .map_err(|e| LifecycleError::Storage(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Pipeline steps
    // -----------------------------------------------------------------------

    async fn load(&self, org_id: Uuid) -> Result<OrganizationRecord, TransitionFailure> {
        self.get(org_id).await.map_err(|err| {
            debug!(org_id = %org_id, error = %err, "Organization could not be loaded");
            TransitionFailure::new(None, err)
        })
    }

    async fn authorize(
        &self,
        actor_id: Uuid,
        action: &str,
        org_id: Uuid,
        timeout: Option<Duration>,
    ) -> Result<(), LifecycleError> {
        let deadline = timeout.unwrap_or_else(|| self.config.permission_timeout());
        let check = self
            .permissions
            .check(actor_id, FPO_RESOURCE, action, org_id);

        match tokio::time::timeout(deadline, check).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(LifecycleError::Forbidden {
                actor_id,
                action: action.to_string(),
                org_id,
            }),
            Ok(Err(ExternalError::Timeout)) | Err(_) => Err(LifecycleError::Timeout {
                operation: "permission check",
            }),
            Ok(Err(other)) => Err(LifecycleError::ExternalService(other.to_string())),
        }
    }

    /// Commit `update` and append `entry` as one non-cancellable unit.
    async fn commit_and_audit(
        &self,
        ctx: &AuditContext,
        status: OrgStatus,
        expected_version: u64,
        update: LifecycleUpdate,
        entry: CreateAuditLogEntry,
    ) -> Result<OrganizationRecord, TransitionFailure> {
        let org_id = ctx.organization_id;
        let orgs = self.orgs.clone();
        let ledger = self.ledger.clone();

        let committed: Committed = tokio::spawn(async move {
            let record = orgs
                .commit(org_id, expected_version, update)
                .await
                .map_err(|e| LifecycleError::from_store(e, org_id))?;
            let appended = ledger.append(entry).await.map_err(|e| e.to_string());
            Ok::<_, LifecycleError>((record, appended))
        })
        .await
        .unwrap_or_else(|join| {
            Err(LifecycleError::Internal(format!("commit task failed: {join}")))
        });

        match committed {
            Ok((record, Ok(_))) => Ok(record),
            Ok((record, Err(message))) => Err(ledger_drift(&record, &ctx.action, message)),
            Err(err) => {
                let current = self.current_status(org_id, status, &err).await;
                Err(self.refuse(ctx, current, err).await)
            }
        }
    }

    /// Record a failed attempt and build the caller-facing failure.
    ///
    /// Concurrent modifications are not audited: the losing request never
    /// reached the write.
    async fn refuse(
        &self,
        ctx: &AuditContext,
        status: OrgStatus,
        err: LifecycleError,
    ) -> TransitionFailure {
        if !matches!(err, LifecycleError::ConcurrentModification { .. }) {
            let entry = AuditLedger::<A>::failure_entry(ctx, status, &err);
            if let Err(ledger_err) = self.ledger.append(entry).await {
                error!(
                    org_id = %ctx.organization_id,
                    action = %ctx.action,
                    request_id = %ctx.request_id,
                    error = %ledger_err,
                    rejection = %err,
                    "Failed to record rejected lifecycle attempt"
                );
            }
        }

        info!(
            org_id = %ctx.organization_id,
            action = %ctx.action,
            status = %status,
            error = %err,
            "Lifecycle operation rejected"
        );
        TransitionFailure::new(Some(status), err)
    }

    /// Status to report after `err`. A concurrent writer may have moved
    /// the record on, so it is re-read in that case.
    async fn current_status(
        &self,
        org_id: Uuid,
        fallback: OrgStatus,
        err: &LifecycleError,
    ) -> OrgStatus {
        if !matches!(err, LifecycleError::ConcurrentModification { .. }) {
            return fallback;
        }
        match self.orgs.get_by_id(org_id).await {
            Ok(record) => record.status,
            Err(_) => fallback,
        }
    }
}

/// The record was written but its audit entry was not. The record stays
/// authoritative; the drift is left to reconciliation.
fn ledger_drift(record: &OrganizationRecord, action: &str, message: String) -> TransitionFailure {
    error!(
        org_id = %record.id,
        action = %action,
        status = %record.status,
        version = record.version,
        reconciliation_required = true,
        error = %message,
        "Audit entry could not be written after commit"
    );
    TransitionFailure::new(Some(record.status), LifecycleError::LedgerWrite(message))
}

/// Verification bookkeeping that accompanies a status change.
fn verification_update(
    action: LifecycleAction,
    actor_id: Uuid,
    reason: &Option<String>,
    now: chrono::DateTime<Utc>,
) -> LifecycleUpdate {
    let decided = |status| LifecycleUpdate {
        verification_status: Some(status),
        verified_at: Some(Some(now)),
        verified_by: Some(Some(actor_id)),
        verification_notes: Some(reason.clone()),
        ..Default::default()
    };

    match action {
        LifecycleAction::Submit => LifecycleUpdate {
            verification_status: Some(VerificationStatus::Pending),
            ..Default::default()
        },
        LifecycleAction::Approve => decided(VerificationStatus::Verified),
        LifecycleAction::Reject => decided(VerificationStatus::Rejected),
        LifecycleAction::Resubmit => LifecycleUpdate {
            verification_status: Some(VerificationStatus::Unverified),
            verified_at: Some(None),
            verified_by: Some(None),
            verification_notes: Some(None),
            ..Default::default()
        },
        _ => LifecycleUpdate::default(),
    }
}

fn validate_registration(input: &CreateOrganization) -> Result<(), LifecycleError> {
    if input.name.trim().is_empty() {
        return Err(LifecycleError::Validation("name must not be empty".into()));
    }
    if input.registration_number.trim().is_empty() {
        return Err(LifecycleError::Validation(
            "registration_number must not be empty".into(),
        ));
    }
    if input.ceo.name.trim().is_empty() {
        return Err(LifecycleError::Validation("ceo name must not be empty".into()));
    }
    if !input.ceo.email.contains('@') {
        return Err(LifecycleError::Validation(format!(
            "invalid ceo email: {}",
            input.ceo.email
        )));
    }
    if input.metadata.as_ref().is_some_and(|m| !m.is_object()) {
        return Err(LifecycleError::Validation(
            "metadata must be a JSON object".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpo_core::models::organization::CeoContact;

    fn registration() -> CreateOrganization {
        CreateOrganization {
            name: "Nashik Grape Growers".into(),
            registration_number: "FPO-MH-0001".into(),
            ceo: CeoContact {
                name: "Asha Patil".into(),
                email: "asha@example.org".into(),
                phone: None,
            },
            parent_fpo_id: None,
            metadata: None,
        }
    }

    #[test]
    fn approval_records_the_decision() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let update = verification_update(
            LifecycleAction::Approve,
            actor,
            &Some("documents checked".into()),
            now,
        );
        assert_eq!(update.verification_status, Some(VerificationStatus::Verified));
        assert_eq!(update.verified_by, Some(Some(actor)));
        assert_eq!(update.verified_at, Some(Some(now)));
        assert_eq!(
            update.verification_notes,
            Some(Some("documents checked".to_string()))
        );
    }

    #[test]
    fn resubmission_clears_the_previous_decision() {
        let update =
            verification_update(LifecycleAction::Resubmit, Uuid::new_v4(), &None, Utc::now());
        assert_eq!(
            update.verification_status,
            Some(VerificationStatus::Unverified)
        );
        assert_eq!(update.verified_at, Some(None));
        assert_eq!(update.verified_by, Some(None));
        assert_eq!(update.verification_notes, Some(None));
    }

    #[test]
    fn operational_actions_leave_verification_alone() {
        let update =
            verification_update(LifecycleAction::Suspend, Uuid::new_v4(), &None, Utc::now());
        assert!(update.verification_status.is_none());
        assert!(update.verified_at.is_none());
    }

    #[test]
    fn registration_requires_core_fields() {
        assert!(validate_registration(&registration()).is_ok());

        let mut input = registration();
        input.name = "  ".into();
        assert!(matches!(
            validate_registration(&input),
            Err(LifecycleError::Validation(_))
        ));

        let mut input = registration();
        input.ceo.email = "not-an-email".into();
        assert!(validate_registration(&input).is_err());

        let mut input = registration();
        input.metadata = Some(serde_json::json!([1, 2]));
        assert!(validate_registration(&input).is_err());
    }
}
