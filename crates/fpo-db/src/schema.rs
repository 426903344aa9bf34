//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "organization_records",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "lifecycle_audit_ledger",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: organization records
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD registration_number ON TABLE organization TYPE string;
DEFINE FIELD metadata ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD external_org_ref ON TABLE organization \
    TYPE option<string>;

-- Lifecycle state
DEFINE FIELD status ON TABLE organization TYPE string \
    ASSERT $value IN ['DRAFT', 'PENDING_VERIFICATION', 'REJECTED', \
    'VERIFIED', 'PENDING_SETUP', 'SETUP_FAILED', 'ACTIVE', \
    'SUSPENDED', 'INACTIVE', 'ARCHIVED'];
DEFINE FIELD previous_status ON TABLE organization TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['DRAFT', 'PENDING_VERIFICATION', \
    'REJECTED', 'VERIFIED', 'PENDING_SETUP', 'SETUP_FAILED', 'ACTIVE', \
    'SUSPENDED', 'INACTIVE', 'ARCHIVED'];
DEFINE FIELD status_reason ON TABLE organization TYPE option<string>;
DEFINE FIELD status_changed_at ON TABLE organization \
    TYPE option<datetime>;
DEFINE FIELD status_changed_by ON TABLE organization \
    TYPE option<string>;

-- Provisioning bookkeeping
DEFINE FIELD setup_attempts ON TABLE organization TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD last_setup_at ON TABLE organization TYPE option<datetime>;
DEFINE FIELD setup_progress ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};

-- Verification bookkeeping
DEFINE FIELD verification_status ON TABLE organization TYPE string \
    ASSERT $value IN ['Unverified', 'Pending', 'Verified', 'Rejected'];
DEFINE FIELD verified_at ON TABLE organization TYPE option<datetime>;
DEFINE FIELD verified_by ON TABLE organization TYPE option<string>;
DEFINE FIELD verification_notes ON TABLE organization \
    TYPE option<string>;

-- Relationships
DEFINE FIELD parent_fpo_id ON TABLE organization TYPE option<string>;
DEFINE FIELD ceo_name ON TABLE organization TYPE string;
DEFINE FIELD ceo_email ON TABLE organization TYPE string;
DEFINE FIELD ceo_phone ON TABLE organization TYPE option<string>;
DEFINE FIELD ceo_user_id ON TABLE organization TYPE option<string>;

-- Concurrency & retention
DEFINE FIELD version ON TABLE organization TYPE int DEFAULT 1;
DEFINE FIELD deleted_at ON TABLE organization TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();

DEFINE INDEX idx_organization_registration ON TABLE organization \
    COLUMNS registration_number UNIQUE;
DEFINE INDEX idx_organization_status ON TABLE organization \
    COLUMNS status;
";

// -----------------------------------------------------------------------
// Schema v2: lifecycle audit ledger (append-only)
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE lifecycle_audit SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD organization_id ON TABLE lifecycle_audit TYPE string;
DEFINE FIELD action ON TABLE lifecycle_audit TYPE string;
DEFINE FIELD previous_state ON TABLE lifecycle_audit TYPE string;
DEFINE FIELD new_state ON TABLE lifecycle_audit TYPE string;
DEFINE FIELD outcome ON TABLE lifecycle_audit TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD reason ON TABLE lifecycle_audit TYPE option<string>;
DEFINE FIELD performed_by ON TABLE lifecycle_audit TYPE string;
DEFINE FIELD performed_at ON TABLE lifecycle_audit TYPE datetime;
DEFINE FIELD details ON TABLE lifecycle_audit TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD request_id ON TABLE lifecycle_audit TYPE string;
DEFINE INDEX idx_audit_org_time ON TABLE lifecycle_audit \
    COLUMNS organization_id, performed_at;
DEFINE INDEX idx_audit_request ON TABLE lifecycle_audit \
    COLUMNS request_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;
    }

    info!(
        current = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema up to date"
    );

    Ok(())
}

/// Version of the newest migration known to this build.
pub fn latest_schema_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
