//! Lifecycle audit ledger domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::organization::OrgStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "Success",
            AuditOutcome::Failure => "Failure",
            AuditOutcome::Denied => "Denied",
        }
    }
}

/// One transition attempt against an organization, successful or not.
///
/// Entries are immutable once written. On a failed attempt
/// `new_state == previous_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Requested operation name, e.g. `submit` or `retry-setup`.
    pub action: String,
    pub previous_state: OrgStatus,
    pub new_state: OrgStatus,
    pub outcome: AuditOutcome,
    pub reason: Option<String>,
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
    /// Structured context, e.g. the failed provisioning step.
    pub details: serde_json::Value,
    /// Correlation id supplied by the caller.
    pub request_id: String,
}

/// Fields required to append an audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    pub organization_id: Uuid,
    pub action: String,
    pub previous_state: OrgStatus,
    pub new_state: OrgStatus,
    pub outcome: AuditOutcome,
    pub reason: Option<String>,
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
    pub details: serde_json::Value,
    pub request_id: String,
}
