//! Lifecycle error types.

use fpo_core::error::FpoError;
use fpo_core::models::organization::{LifecycleAction, OrgStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("organization {org_id} not found")]
    NotFound { org_id: Uuid },

    #[error("actor {actor_id} is not permitted to {action} organization {org_id}")]
    Forbidden {
        actor_id: Uuid,
        action: String,
        org_id: Uuid,
    },

    #[error("cannot {action} an organization in state {from}")]
    InvalidTransition {
        from: OrgStatus,
        action: LifecycleAction,
    },

    #[error("{operation} is not allowed in state {status}")]
    OperationNotAllowed {
        operation: &'static str,
        status: OrgStatus,
    },

    #[error("organization {org_id} was modified concurrently; reload and retry")]
    ConcurrentModification { org_id: Uuid },

    #[error("setup attempts exhausted ({attempts} of {max})")]
    RetryExhausted { attempts: u32, max: u32 },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("audit ledger write failed after commit: {0}")]
    LedgerWrite(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    /// Map a repository error raised while working on `org_id`.
    pub fn from_store(err: FpoError, org_id: Uuid) -> Self {
        match err {
            FpoError::NotFound { .. } => LifecycleError::NotFound { org_id },
            FpoError::ConcurrentModification { .. } => {
                LifecycleError::ConcurrentModification { org_id }
            }
            FpoError::AlreadyExists { entity } => {
                LifecycleError::Validation(format!("{entity} already exists"))
            }
            FpoError::Validation { message } => LifecycleError::Validation(message),
            other => LifecycleError::Storage(other.to_string()),
        }
    }

    /// Stable machine-readable name, recorded in audit details.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "not_found",
            LifecycleError::Forbidden { .. } => "forbidden",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::OperationNotAllowed { .. } => "operation_not_allowed",
            LifecycleError::ConcurrentModification { .. } => "concurrent_modification",
            LifecycleError::RetryExhausted { .. } => "retry_exhausted",
            LifecycleError::Timeout { .. } => "timeout",
            LifecycleError::ExternalService(_) => "external_service_error",
            LifecycleError::Validation(_) => "validation",
            LifecycleError::Storage(_) => "storage",
            LifecycleError::LedgerWrite(_) => "ledger_write",
            LifecycleError::Internal(_) => "internal",
        }
    }
}

/// A rejected or failed lifecycle operation.
///
/// Carries the organization's current status so callers know the true
/// state without another read. `status` is `None` only when the
/// organization could not be loaded.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TransitionFailure {
    pub status: Option<OrgStatus>,
    #[source]
    pub error: LifecycleError,
}

impl TransitionFailure {
    pub fn new(status: Option<OrgStatus>, error: LifecycleError) -> Self {
        Self { status, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_meaning() {
        let org_id = Uuid::new_v4();

        let err = LifecycleError::from_store(
            FpoError::ConcurrentModification {
                entity: "organization".into(),
                id: org_id.to_string(),
            },
            org_id,
        );
        assert!(matches!(err, LifecycleError::ConcurrentModification { org_id: id } if id == org_id));

        let err = LifecycleError::from_store(
            FpoError::NotFound {
                entity: "organization".into(),
                id: org_id.to_string(),
            },
            org_id,
        );
        assert_eq!(err.kind(), "not_found");

        let err = LifecycleError::from_store(FpoError::Database("down".into()), org_id);
        assert_eq!(err.kind(), "storage");
    }

    #[test]
    fn invalid_transition_names_state_and_action() {
        let err = LifecycleError::InvalidTransition {
            from: OrgStatus::Active,
            action: LifecycleAction::Archive,
        };
        assert_eq!(
            err.to_string(),
            "cannot archive an organization in state ACTIVE"
        );
    }
}
