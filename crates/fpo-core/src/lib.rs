//! FPO core: domain models, error taxonomy, repository traits and the
//! external access-control capabilities shared by every crate.

pub mod access;
pub mod error;
pub mod models;
pub mod repository;

pub use error::{FpoError, FpoResult};
