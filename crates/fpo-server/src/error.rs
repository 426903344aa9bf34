use fpo_access::AccessClientError;
use fpo_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Access(#[from] AccessClientError),

    #[error("startup check failed: {0}")]
    Startup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
