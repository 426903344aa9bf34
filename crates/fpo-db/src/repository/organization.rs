//! SurrealDB implementation of [`OrganizationRepository`].
//!
//! Every lifecycle write is a single `UPDATE … WHERE version = $expected`
//! statement. An empty result means the guard failed; a follow-up read
//! tells a stale version apart from a missing or erased record.

use chrono::{DateTime, Utc};
use fpo_core::error::{FpoError, FpoResult};
use fpo_core::models::organization::{
    CeoContact, CreateOrganization, LifecycleUpdate, OrgStatus, OrganizationRecord,
    SetupProgress, VerificationStatus,
};
use fpo_core::repository::{OrganizationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

const ENTITY: &str = "organization";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    registration_number: String,
    metadata: serde_json::Value,
    external_org_ref: Option<String>,
    status: String,
    previous_status: Option<String>,
    status_reason: Option<String>,
    status_changed_at: Option<DateTime<Utc>>,
    status_changed_by: Option<String>,
    setup_attempts: u32,
    last_setup_at: Option<DateTime<Utc>>,
    setup_progress: serde_json::Value,
    verification_status: String,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<String>,
    verification_notes: Option<String>,
    parent_fpo_id: Option<String>,
    ceo_name: String,
    ceo_email: String,
    ceo_phone: Option<String>,
    ceo_user_id: Option<String>,
    version: u64,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    registration_number: String,
    metadata: serde_json::Value,
    external_org_ref: Option<String>,
    status: String,
    previous_status: Option<String>,
    status_reason: Option<String>,
    status_changed_at: Option<DateTime<Utc>>,
    status_changed_by: Option<String>,
    setup_attempts: u32,
    last_setup_at: Option<DateTime<Utc>>,
    setup_progress: serde_json::Value,
    verification_status: String,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<String>,
    verification_notes: Option<String>,
    parent_fpo_id: Option<String>,
    ceo_name: String,
    ceo_email: String,
    ceo_phone: Option<String>,
    ceo_user_id: Option<String>,
    version: u64,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_record(self) -> Result<OrganizationRecord, DbError> {
        let id = parse_uuid(&self.record_id, "id")?;
        OrganizationRow {
            name: self.name,
            registration_number: self.registration_number,
            metadata: self.metadata,
            external_org_ref: self.external_org_ref,
            status: self.status,
            previous_status: self.previous_status,
            status_reason: self.status_reason,
            status_changed_at: self.status_changed_at,
            status_changed_by: self.status_changed_by,
            setup_attempts: self.setup_attempts,
            last_setup_at: self.last_setup_at,
            setup_progress: self.setup_progress,
            verification_status: self.verification_status,
            verified_at: self.verified_at,
            verified_by: self.verified_by,
            verification_notes: self.verification_notes,
            parent_fpo_id: self.parent_fpo_id,
            ceo_name: self.ceo_name,
            ceo_email: self.ceo_email,
            ceo_phone: self.ceo_phone,
            ceo_user_id: self.ceo_user_id,
            version: self.version,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_record(id)
    }
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

fn parse_optional_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>, DbError> {
    value.as_deref().map(|v| parse_uuid(v, field)).transpose()
}

fn parse_status(value: &str) -> Result<OrgStatus, DbError> {
    value
        .parse()
        .map_err(|e: fpo_core::FpoError| DbError::Corrupt(e.to_string()))
}

impl OrganizationRow {
    fn into_record(self, id: Uuid) -> Result<OrganizationRecord, DbError> {
        let previous_status = self.previous_status.as_deref().map(parse_status).transpose()?;
        let verification_status = self
            .verification_status
            .parse::<VerificationStatus>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;
        let setup_progress = SetupProgress::from_json(&self.setup_progress)
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(OrganizationRecord {
            id,
            name: self.name,
            registration_number: self.registration_number,
            metadata: self.metadata,
            external_org_ref: self.external_org_ref,
            status: parse_status(&self.status)?,
            previous_status,
            status_reason: self.status_reason,
            status_changed_at: self.status_changed_at,
            status_changed_by: parse_optional_uuid(self.status_changed_by, "status_changed_by")?,
            setup_attempts: self.setup_attempts,
            last_setup_at: self.last_setup_at,
            setup_progress,
            verification_status,
            verified_at: self.verified_at,
            verified_by: parse_optional_uuid(self.verified_by, "verified_by")?,
            verification_notes: self.verification_notes,
            parent_fpo_id: parse_optional_uuid(self.parent_fpo_id, "parent_fpo_id")?,
            ceo: CeoContact {
                name: self.ceo_name,
                email: self.ceo_email,
                phone: self.ceo_phone,
            },
            ceo_user_id: self.ceo_user_id,
            version: self.version,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the organization record repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Decide why a guarded write matched no rows.
    async fn guard_failure(&self, id: Uuid) -> FpoError {
        classify_guard_failure(self.get_by_id(id).await, id)
    }
}

/// A live record means the version moved on; a missing one means it never
/// existed or was erased. Any other read failure is passed through as is.
fn classify_guard_failure(reread: FpoResult<OrganizationRecord>, id: Uuid) -> FpoError {
    match reread {
        Ok(_) => DbError::Conflict {
            entity: ENTITY.into(),
            id: id.to_string(),
        }
        .into(),
        Err(FpoError::NotFound { .. }) => DbError::NotFound {
            entity: ENTITY.into(),
            id: id.to_string(),
        }
        .into(),
        Err(other) => other,
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> FpoResult<OrganizationRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, \
                 registration_number = $registration_number, \
                 metadata = $metadata, \
                 external_org_ref = NONE, \
                 status = $status, \
                 previous_status = NONE, \
                 setup_attempts = 0, \
                 setup_progress = $setup_progress, \
                 verification_status = $verification_status, \
                 parent_fpo_id = $parent_fpo_id, \
                 ceo_name = $ceo_name, \
                 ceo_email = $ceo_email, \
                 ceo_phone = $ceo_phone, \
                 ceo_user_id = NONE, \
                 version = 1, \
                 deleted_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("registration_number", input.registration_number))
            .bind(("metadata", metadata))
            .bind(("status", OrgStatus::Draft.as_str().to_string()))
            .bind(("setup_progress", SetupProgress::default().to_json()))
            .bind((
                "verification_status",
                VerificationStatus::Unverified.as_str().to_string(),
            ))
            .bind(("parent_fpo_id", input.parent_fpo_id.map(|p| p.to_string())))
            .bind(("ceo_name", input.ceo.name))
            .bind(("ceo_email", input.ceo.email))
            .bind(("ceo_phone", input.ceo.phone))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), ENTITY, &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_record(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FpoResult<OrganizationRecord> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('organization', $id) \
                 WHERE deleted_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_record(id)?)
    }

    async fn commit(
        &self,
        id: Uuid,
        expected_version: u64,
        update: LifecycleUpdate,
    ) -> FpoResult<OrganizationRecord> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if update.status.is_some() {
            sets.push("status = $status");
        }
        if update.previous_status.is_some() {
            sets.push("previous_status = $previous_status");
        }
        if update.status_reason.is_some() {
            sets.push("status_reason = $status_reason");
        }
        if update.status_changed_at.is_some() {
            sets.push("status_changed_at = $status_changed_at");
        }
        if update.status_changed_by.is_some() {
            sets.push("status_changed_by = $status_changed_by");
        }
        if update.setup_attempts.is_some() {
            sets.push("setup_attempts = $setup_attempts");
        }
        if update.last_setup_at.is_some() {
            sets.push("last_setup_at = $last_setup_at");
        }
        if update.setup_progress.is_some() {
            sets.push("setup_progress = $setup_progress");
        }
        if update.external_org_ref.is_some() {
            sets.push("external_org_ref = $external_org_ref");
        }
        if update.ceo_user_id.is_some() {
            sets.push("ceo_user_id = $ceo_user_id");
        }
        if update.verification_status.is_some() {
            sets.push("verification_status = $verification_status");
        }
        if update.verified_at.is_some() {
            sets.push("verified_at = $verified_at");
        }
        if update.verified_by.is_some() {
            sets.push("verified_by = $verified_by");
        }
        if update.verification_notes.is_some() {
            sets.push("verification_notes = $verification_notes");
        }
        sets.push("version += 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('organization', $id) SET {} \
             WHERE version = $expected_version AND deleted_at = NONE",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("expected_version", expected_version));

        if let Some(status) = update.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }
        if let Some(previous) = update.previous_status {
            builder = builder.bind(("previous_status", previous.as_str().to_string()));
        }
        if let Some(reason) = update.status_reason {
            builder = builder.bind(("status_reason", reason));
        }
        if let Some(changed_at) = update.status_changed_at {
            builder = builder.bind(("status_changed_at", changed_at));
        }
        if let Some(changed_by) = update.status_changed_by {
            builder = builder.bind(("status_changed_by", changed_by.to_string()));
        }
        if let Some(attempts) = update.setup_attempts {
            builder = builder.bind(("setup_attempts", attempts));
        }
        if let Some(last_setup_at) = update.last_setup_at {
            builder = builder.bind(("last_setup_at", last_setup_at));
        }
        if let Some(progress) = update.setup_progress {
            builder = builder.bind(("setup_progress", progress.to_json()));
        }
        if let Some(external_org_ref) = update.external_org_ref {
            builder = builder.bind(("external_org_ref", external_org_ref));
        }
        if let Some(ceo_user_id) = update.ceo_user_id {
            builder = builder.bind(("ceo_user_id", ceo_user_id));
        }
        if let Some(verification) = update.verification_status {
            builder = builder.bind(("verification_status", verification.as_str().to_string()));
        }
        if let Some(verified_at) = update.verified_at {
            builder = builder.bind(("verified_at", verified_at));
        }
        if let Some(verified_by) = update.verified_by {
            builder = builder.bind(("verified_by", verified_by.map(|v| v.to_string())));
        }
        if let Some(notes) = update.verification_notes {
            builder = builder.bind(("verification_notes", notes));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), ENTITY, &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            let err = self.guard_failure(id).await;
            debug!(org_id = %id, expected_version, error = %err, "Guarded write rejected");
            return Err(err);
        };

        Ok(row.into_record(id)?)
    }

    async fn erase(&self, id: Uuid, expected_version: u64) -> FpoResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('organization', $id) SET \
                 deleted_at = time::now(), version += 1, \
                 updated_at = time::now() \
                 WHERE version = $expected_version AND deleted_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("expected_version", expected_version))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), ENTITY, &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(self.guard_failure(id).await);
        }

        Ok(())
    }

    async fn list(
        &self,
        status: Option<OrgStatus>,
        pagination: Pagination,
    ) -> FpoResult<PaginatedResult<OrganizationRecord>> {
        let filter = if status.is_some() {
            "WHERE deleted_at = NONE AND status = $status"
        } else {
            "WHERE deleted_at = NONE"
        };
        let status_str = status.map(|s| s.as_str().to_string());

        let count_query = format!("SELECT count() AS total FROM organization {filter} GROUP ALL");
        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM organization {filter} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset"
        );

        let mut count_result = self
            .db
            .query(&count_query)
            .bind(("status", status_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(&list_query)
            .bind(("status", status_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
