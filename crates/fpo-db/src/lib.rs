//! FPO database: SurrealDB connection management, schema migrations
//! and repository implementations for organization records and the
//! lifecycle audit ledger.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{latest_schema_version, run_migrations};
