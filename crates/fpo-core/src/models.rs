//! Domain models for the FPO registry.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod organization;
