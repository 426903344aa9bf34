//! Capabilities consumed from the external identity and access-control
//! service.
//!
//! The service itself is out of scope; these traits are the only surface
//! the registry depends on. Implementations must report failures through
//! [`ExternalError`] so callers can tell transient faults from
//! application-level rejections.

use thiserror::Error;
use uuid::Uuid;

/// Resource name used for permission checks on organization records.
pub const FPO_RESOURCE: &str = "fpo";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    /// The call did not complete within its deadline.
    #[error("external call timed out")]
    Timeout,

    /// The service was unreachable or reported a temporary outage.
    #[error("external service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request (e.g. duplicate registration).
    #[error("rejected by external service: {0}")]
    Rejected(String),

    #[error("unexpected external service error: {0}")]
    Unexpected(String),
}

impl ExternalError {
    /// Whether the failure may succeed on a repeated call.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExternalError::Timeout | ExternalError::Unavailable(_))
    }
}

/// Identity profile of a user to create in the external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub external_org_ref: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
}

pub trait PermissionChecker: Send + Sync {
    /// Ask whether `actor_id` may perform `action` on `resource` of `org_id`.
    fn check(
        &self,
        actor_id: Uuid,
        resource: &str,
        action: &str,
        org_id: Uuid,
    ) -> impl Future<Output = Result<bool, ExternalError>> + Send;
}

pub trait AccessControlService: Send + Sync {
    /// Create the organization; returns the external organization reference.
    fn create_organization(
        &self,
        name: &str,
        metadata: &serde_json::Value,
    ) -> impl Future<Output = Result<String, ExternalError>> + Send;

    /// Create a user; returns the external user reference.
    fn create_user(
        &self,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<String, ExternalError>> + Send;

    /// Install the default role and permission catalog for an organization.
    fn assign_default_roles(
        &self,
        external_org_ref: &str,
    ) -> impl Future<Output = Result<(), ExternalError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_outages_are_transient() {
        assert!(ExternalError::Timeout.is_transient());
        assert!(ExternalError::Unavailable("503".into()).is_transient());
        assert!(!ExternalError::Rejected("duplicate".into()).is_transient());
        assert!(!ExternalError::Unexpected("boom".into()).is_transient());
    }
}
