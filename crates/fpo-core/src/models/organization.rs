//! Organization (FPO) domain model.
//!
//! An organization record is the unit of lifecycle management: it moves
//! from registration through verification and external provisioning to
//! operation and, eventually, archival. Lifecycle fields are only ever
//! written by the lifecycle controller.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FpoError;

/// Lifecycle state of an organization record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgStatus {
    Draft,
    PendingVerification,
    Rejected,
    Verified,
    PendingSetup,
    SetupFailed,
    Active,
    Suspended,
    Inactive,
    Archived,
}

impl OrgStatus {
    pub const ALL: [OrgStatus; 10] = [
        OrgStatus::Draft,
        OrgStatus::PendingVerification,
        OrgStatus::Rejected,
        OrgStatus::Verified,
        OrgStatus::PendingSetup,
        OrgStatus::SetupFailed,
        OrgStatus::Active,
        OrgStatus::Suspended,
        OrgStatus::Inactive,
        OrgStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgStatus::Draft => "DRAFT",
            OrgStatus::PendingVerification => "PENDING_VERIFICATION",
            OrgStatus::Rejected => "REJECTED",
            OrgStatus::Verified => "VERIFIED",
            OrgStatus::PendingSetup => "PENDING_SETUP",
            OrgStatus::SetupFailed => "SETUP_FAILED",
            OrgStatus::Active => "ACTIVE",
            OrgStatus::Suspended => "SUSPENDED",
            OrgStatus::Inactive => "INACTIVE",
            OrgStatus::Archived => "ARCHIVED",
        }
    }

    /// `ARCHIVED` is the only state with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrgStatus::Archived)
    }
}

impl fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgStatus {
    type Err = FpoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrgStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| FpoError::Validation {
                message: format!("unknown organization status: {s}"),
            })
    }
}

/// An operation requested against an organization's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleAction {
    Submit,
    Approve,
    Reject,
    Resubmit,
    Archive,
    BeginSetup,
    /// System action: provisioning completed every step.
    SetupSucceeded,
    /// System action: a provisioning step failed.
    SetupFailed,
    RetrySetup,
    Suspend,
    Deactivate,
    Reinstate,
    Reactivate,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 13] = [
        LifecycleAction::Submit,
        LifecycleAction::Approve,
        LifecycleAction::Reject,
        LifecycleAction::Resubmit,
        LifecycleAction::Archive,
        LifecycleAction::BeginSetup,
        LifecycleAction::SetupSucceeded,
        LifecycleAction::SetupFailed,
        LifecycleAction::RetrySetup,
        LifecycleAction::Suspend,
        LifecycleAction::Deactivate,
        LifecycleAction::Reinstate,
        LifecycleAction::Reactivate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Submit => "submit",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Reject => "reject",
            LifecycleAction::Resubmit => "resubmit",
            LifecycleAction::Archive => "archive",
            LifecycleAction::BeginSetup => "begin-setup",
            LifecycleAction::SetupSucceeded => "setup-succeeded",
            LifecycleAction::SetupFailed => "setup-failed",
            LifecycleAction::RetrySetup => "retry-setup",
            LifecycleAction::Suspend => "suspend",
            LifecycleAction::Deactivate => "deactivate",
            LifecycleAction::Reinstate => "reinstate",
            LifecycleAction::Reactivate => "reactivate",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = FpoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| FpoError::Validation {
                message: format!("unknown lifecycle action: {s}"),
            })
    }
}

/// One step of the external provisioning sequence, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    OrgCreated,
    CeoCreated,
    RolesAssigned,
}

impl SetupStep {
    pub const ORDER: [SetupStep; 3] = [
        SetupStep::OrgCreated,
        SetupStep::CeoCreated,
        SetupStep::RolesAssigned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SetupStep::OrgCreated => "org_created",
            SetupStep::CeoCreated => "ceo_created",
            SetupStep::RolesAssigned => "roles_assigned",
        }
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of which provisioning steps have completed.
///
/// Serialized as an ordered map of step name to completion flag, e.g.
/// `{"org_created": true, "ceo_created": false, "roles_assigned": false}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SetupProgress(BTreeMap<SetupStep, bool>);

impl Default for SetupProgress {
    fn default() -> Self {
        Self(SetupStep::ORDER.into_iter().map(|s| (s, false)).collect())
    }
}

impl SetupProgress {
    pub fn is_done(&self, step: SetupStep) -> bool {
        self.0.get(&step).copied().unwrap_or(false)
    }

    pub fn mark_done(&mut self, step: SetupStep) {
        self.0.insert(step, true);
    }

    pub fn is_complete(&self) -> bool {
        SetupStep::ORDER.into_iter().all(|s| self.is_done(s))
    }

    /// The first step that has not completed yet.
    pub fn next_pending(&self) -> Option<SetupStep> {
        SetupStep::ORDER.into_iter().find(|s| !self.is_done(*s))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(step, done)| (step.as_str().to_string(), serde_json::Value::Bool(*done)))
                .collect(),
        )
    }

    /// Parse a stored progress object. Missing keys count as not done.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, FpoError> {
        let mut progress = SetupProgress::default();
        let Some(map) = value.as_object() else {
            return Err(FpoError::Validation {
                message: format!("setup progress must be an object, got {value}"),
            });
        };
        for step in SetupStep::ORDER {
            if map.get(step.as_str()).and_then(|v| v.as_bool()) == Some(true) {
                progress.mark_done(step);
            }
        }
        Ok(progress)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "Unverified",
            VerificationStatus::Pending => "Pending",
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = FpoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unverified" => Ok(VerificationStatus::Unverified),
            "Pending" => Ok(VerificationStatus::Pending),
            "Verified" => Ok(VerificationStatus::Verified),
            "Rejected" => Ok(VerificationStatus::Rejected),
            other => Err(FpoError::Validation {
                message: format!("unknown verification status: {other}"),
            }),
        }
    }
}

/// Contact details of the CEO, used to provision the CEO identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CeoContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A farmer-producer organization under lifecycle management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: Uuid,
    pub name: String,
    /// Statutory registration number; unique across records.
    pub registration_number: String,
    pub metadata: serde_json::Value,
    /// Reference of the organization in the access-control service.
    pub external_org_ref: Option<String>,

    pub status: OrgStatus,
    pub previous_status: Option<OrgStatus>,
    pub status_reason: Option<String>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Uuid>,

    pub setup_attempts: u32,
    pub last_setup_at: Option<DateTime<Utc>>,
    pub setup_progress: SetupProgress,

    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verification_notes: Option<String>,

    pub parent_fpo_id: Option<Uuid>,
    pub ceo: CeoContact,
    /// Identity of the CEO account, set once the CEO step succeeds.
    pub ceo_user_id: Option<String>,

    /// Optimistic concurrency token, bumped on every committed write.
    pub version: u64,
    /// Set only by compliance erasure.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub registration_number: String,
    pub ceo: CeoContact,
    pub parent_fpo_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

/// A version-conditioned change to an organization's lifecycle fields.
///
/// `None` leaves a field untouched. For nullable fields,
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct LifecycleUpdate {
    pub status: Option<OrgStatus>,
    pub previous_status: Option<OrgStatus>,
    pub status_reason: Option<Option<String>>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Uuid>,
    pub setup_attempts: Option<u32>,
    pub last_setup_at: Option<DateTime<Utc>>,
    pub setup_progress: Option<SetupProgress>,
    pub external_org_ref: Option<String>,
    pub ceo_user_id: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    pub verified_at: Option<Option<DateTime<Utc>>>,
    pub verified_by: Option<Option<Uuid>>,
    pub verification_notes: Option<Option<String>>,
}
