//! SurrealDB repository implementations.

mod audit;
mod organization;

pub use audit::SurrealAuditLogRepository;
pub use organization::SurrealOrganizationRepository;
