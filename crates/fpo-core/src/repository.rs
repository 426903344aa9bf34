//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Writes to an organization's
//! lifecycle fields are conditioned on the record version that the
//! caller read, so concurrent writers cannot both succeed against the
//! same prior state.

use uuid::Uuid;

use crate::error::FpoResult;
use crate::models::{
    audit::{AuditLogEntry, CreateAuditLogEntry},
    organization::{CreateOrganization, LifecycleUpdate, OrgStatus, OrganizationRecord},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Organization records
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    /// Insert a new record in `DRAFT` with version 1.
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = FpoResult<OrganizationRecord>> + Send;

    /// Fetch a live record. Erased records are reported as `NotFound`.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FpoResult<OrganizationRecord>> + Send;

    /// Apply `update` if the stored version still equals
    /// `expected_version`, bumping the version by one.
    ///
    /// Fails with `ConcurrentModification` on a version mismatch and
    /// `NotFound` if the record is absent or erased.
    fn commit(
        &self,
        id: Uuid,
        expected_version: u64,
        update: LifecycleUpdate,
    ) -> impl Future<Output = FpoResult<OrganizationRecord>> + Send;

    /// Compliance erasure: sets `deleted_at`, conditioned on the version.
    fn erase(
        &self,
        id: Uuid,
        expected_version: u64,
    ) -> impl Future<Output = FpoResult<()>> + Send;

    /// List live records, optionally restricted to one status.
    fn list(
        &self,
        status: Option<OrgStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = FpoResult<PaginatedResult<OrganizationRecord>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit ledger (append-only)
// ---------------------------------------------------------------------------

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = FpoResult<AuditLogEntry>> + Send;

    /// Entries for one organization, oldest first.
    fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = FpoResult<PaginatedResult<AuditLogEntry>>> + Send;
}
