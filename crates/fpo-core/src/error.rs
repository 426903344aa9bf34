//! Error types shared by the FPO registry crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FpoError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A version-conditioned write found the record changed since it was read.
    #[error("Concurrent modification of {entity} with id {id}")]
    ConcurrentModification { entity: String, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type FpoResult<T> = Result<T, FpoError>;
