//! Audit ledger: builds and appends one entry per lifecycle attempt.

use chrono::Utc;
use fpo_core::error::FpoResult;
use fpo_core::models::audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use fpo_core::models::organization::{OrgStatus, SetupStep};
use fpo_core::repository::{AuditLogRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use crate::error::LifecycleError;

/// Who asked for what, carried unchanged into the audit entry.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub organization_id: Uuid,
    pub action: String,
    pub actor_id: Uuid,
    pub reason: Option<String>,
    pub request_id: String,
}

/// Append-only view over an [`AuditLogRepository`].
#[derive(Clone)]
pub struct AuditLedger<A: AuditLogRepository> {
    repo: A,
}

impl<A: AuditLogRepository> AuditLedger<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    /// Build the entry for a successful attempt.
    pub fn success_entry(
        ctx: &AuditContext,
        previous: OrgStatus,
        new: OrgStatus,
        details: serde_json::Value,
    ) -> CreateAuditLogEntry {
        Self::entry(ctx, previous, new, AuditOutcome::Success, details)
    }

    /// Build the entry for an attempt that left the status at `status`.
    ///
    /// Permission denials are recorded as `Denied`, everything else as
    /// `Failure`.
    pub fn failure_entry(
        ctx: &AuditContext,
        status: OrgStatus,
        error: &LifecycleError,
    ) -> CreateAuditLogEntry {
        let outcome = match error {
            LifecycleError::Forbidden { .. } => AuditOutcome::Denied,
            _ => AuditOutcome::Failure,
        };
        let details = serde_json::json!({
            "error": error.kind(),
            "message": error.to_string(),
        });
        Self::entry(ctx, status, status, outcome, details)
    }

    /// Build the entry for a provisioning attempt that ended in
    /// `SETUP_FAILED`. The status did change, but the outcome is a failure.
    pub fn setup_failure_entry(
        ctx: &AuditContext,
        previous: OrgStatus,
        new: OrgStatus,
        step: SetupStep,
        cause: &str,
    ) -> CreateAuditLogEntry {
        let details = serde_json::json!({ "step": step.as_str(), "cause": cause });
        Self::entry(ctx, previous, new, AuditOutcome::Failure, details)
    }

    fn entry(
        ctx: &AuditContext,
        previous: OrgStatus,
        new: OrgStatus,
        outcome: AuditOutcome,
        details: serde_json::Value,
    ) -> CreateAuditLogEntry {
        CreateAuditLogEntry {
            organization_id: ctx.organization_id,
            action: ctx.action.clone(),
            previous_state: previous,
            new_state: new,
            outcome,
            reason: ctx.reason.clone(),
            performed_by: ctx.actor_id,
            performed_at: Utc::now(),
            details,
            request_id: ctx.request_id.clone(),
        }
    }

    pub async fn append(&self, entry: CreateAuditLogEntry) -> FpoResult<AuditLogEntry> {
        self.repo.append(entry).await
    }

    /// An organization's entries, oldest first.
    pub async fn history(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> FpoResult<PaginatedResult<AuditLogEntry>> {
        self.repo
            .list_by_organization(organization_id, pagination)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpo_core::models::organization::LifecycleAction;

    struct NoopRepo;

    impl AuditLogRepository for NoopRepo {
        async fn append(&self, _input: CreateAuditLogEntry) -> FpoResult<AuditLogEntry> {
            unreachable!("entry builders never touch the repository")
        }

        async fn list_by_organization(
            &self,
            _organization_id: Uuid,
            _pagination: Pagination,
        ) -> FpoResult<PaginatedResult<AuditLogEntry>> {
            unreachable!("entry builders never touch the repository")
        }
    }

    fn ctx() -> AuditContext {
        AuditContext {
            organization_id: Uuid::new_v4(),
            action: "approve".into(),
            actor_id: Uuid::new_v4(),
            reason: Some("field visit done".into()),
            request_id: "req-1".into(),
        }
    }

    #[test]
    fn failed_attempt_keeps_state_unchanged() {
        let err = LifecycleError::InvalidTransition {
            from: OrgStatus::Draft,
            action: LifecycleAction::Approve,
        };
        let entry = AuditLedger::<NoopRepo>::failure_entry(&ctx(), OrgStatus::Draft, &err);

        assert_eq!(entry.previous_state, OrgStatus::Draft);
        assert_eq!(entry.new_state, OrgStatus::Draft);
        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert_eq!(entry.details["error"], "invalid_transition");
        assert_eq!(entry.request_id, "req-1");
    }

    #[test]
    fn permission_denial_is_recorded_as_denied() {
        let context = ctx();
        let err = LifecycleError::Forbidden {
            actor_id: context.actor_id,
            action: "approve".into(),
            org_id: context.organization_id,
        };
        let entry =
            AuditLedger::<NoopRepo>::failure_entry(&context, OrgStatus::PendingVerification, &err);
        assert_eq!(entry.outcome, AuditOutcome::Denied);
    }

    #[test]
    fn success_entry_carries_both_states() {
        let entry = AuditLedger::<NoopRepo>::success_entry(
            &ctx(),
            OrgStatus::PendingVerification,
            OrgStatus::Verified,
            serde_json::json!({}),
        );
        assert_eq!(entry.previous_state, OrgStatus::PendingVerification);
        assert_eq!(entry.new_state, OrgStatus::Verified);
        assert_eq!(entry.outcome, AuditOutcome::Success);
        assert_eq!(entry.reason.as_deref(), Some("field visit done"));
    }

    #[test]
    fn setup_failure_names_the_step() {
        let entry = AuditLedger::<NoopRepo>::setup_failure_entry(
            &ctx(),
            OrgStatus::Verified,
            OrgStatus::SetupFailed,
            SetupStep::OrgCreated,
            "external call timed out",
        );
        assert_eq!(entry.new_state, OrgStatus::SetupFailed);
        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert_eq!(entry.details["step"], "org_created");
        assert_eq!(entry.details["cause"], "external call timed out");
    }
}
