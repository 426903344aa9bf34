//! FPO access: HTTP implementation of the permission-check and
//! provisioning capabilities of the external access-control service.

mod client;
mod config;

pub use client::{AccessClientError, HttpAccessControlClient};
pub use config::AccessClientConfig;
