//! Database-specific error types and conversions.

use fpo_core::error::FpoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Write conflict on {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Duplicate { entity: String },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify a failed statement, recognising storage-level write
    /// conflicts and unique index violations.
    pub(crate) fn from_statement(message: String, entity: &str, id: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("conflict") {
            DbError::Conflict {
                entity: entity.into(),
                id: id.into(),
            }
        } else if lower.contains("already contains") || lower.contains("already exists") {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for FpoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FpoError::NotFound { entity, id },
            DbError::Conflict { entity, id } => FpoError::ConcurrentModification { entity, id },
            DbError::Duplicate { entity } => FpoError::AlreadyExists { entity },
            DbError::Corrupt(msg) => FpoError::Internal(msg),
            other => FpoError::Database(other.to_string()),
        }
    }
}
