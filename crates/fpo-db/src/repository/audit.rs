//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The `lifecycle_audit` table only ever receives `CREATE` statements.

use chrono::{DateTime, Utc};
use fpo_core::error::FpoResult;
use fpo_core::models::audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use fpo_core::models::organization::OrgStatus;
use fpo_core::repository::{AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const ENTITY: &str = "lifecycle_audit";

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    organization_id: String,
    action: String,
    previous_state: String,
    new_state: String,
    outcome: String,
    reason: Option<String>,
    performed_by: String,
    performed_at: DateTime<Utc>,
    details: serde_json::Value,
    request_id: String,
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, DbError> {
    match s {
        "Success" => Ok(AuditOutcome::Success),
        "Failure" => Ok(AuditOutcome::Failure),
        "Denied" => Ok(AuditOutcome::Denied),
        other => Err(DbError::Corrupt(format!("unknown audit outcome: {other}"))),
    }
}

fn parse_state(s: &str) -> Result<OrgStatus, DbError> {
    s.parse()
        .map_err(|e: fpo_core::FpoError| DbError::Corrupt(e.to_string()))
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| DbError::Corrupt(format!("invalid organization UUID: {e}")))?;
        let performed_by = Uuid::parse_str(&self.performed_by)
            .map_err(|e| DbError::Corrupt(format!("invalid actor UUID: {e}")))?;

        Ok(AuditLogEntry {
            id,
            organization_id,
            action: self.action,
            previous_state: parse_state(&self.previous_state)?,
            new_state: parse_state(&self.new_state)?,
            outcome: parse_outcome(&self.outcome)?,
            reason: self.reason,
            performed_by,
            performed_at: self.performed_at,
            details: self.details,
            request_id: self.request_id,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the lifecycle audit ledger.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> FpoResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let details = if input.details.is_object() {
            input.details.clone()
        } else {
            serde_json::json!({ "value": input.details })
        };

        let result = self
            .db
            .query(
                "CREATE type::record('lifecycle_audit', $id) SET \
                 organization_id = $organization_id, \
                 action = $action, \
                 previous_state = $previous_state, \
                 new_state = $new_state, \
                 outcome = $outcome, \
                 reason = $reason, \
                 performed_by = $performed_by, \
                 performed_at = $performed_at, \
                 details = $details, \
                 request_id = $request_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("action", input.action.clone()))
            .bind(("previous_state", input.previous_state.as_str().to_string()))
            .bind(("new_state", input.new_state.as_str().to_string()))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind(("reason", input.reason.clone()))
            .bind(("performed_by", input.performed_by.to_string()))
            .bind(("performed_at", input.performed_at))
            .bind(("details", details.clone()))
            .bind(("request_id", input.request_id.clone()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), ENTITY, &id_str))?;

        Ok(AuditLogEntry {
            id,
            organization_id: input.organization_id,
            action: input.action,
            previous_state: input.previous_state,
            new_state: input.new_state,
            outcome: input.outcome,
            reason: input.reason,
            performed_by: input.performed_by,
            performed_at: input.performed_at,
            details,
            request_id: input.request_id,
        })
    }

    async fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> FpoResult<PaginatedResult<AuditLogEntry>> {
        let org_id_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM lifecycle_audit \
                 WHERE organization_id = $organization_id GROUP ALL",
            )
            .bind(("organization_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lifecycle_audit \
                 WHERE organization_id = $organization_id \
                 ORDER BY performed_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("organization_id", org_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
