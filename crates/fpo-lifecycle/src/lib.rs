//! FPO lifecycle: the state table, provisioning, the audit ledger and the
//! controller that ties them together.

pub mod config;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod provisioning;
pub mod transition;

pub use config::LifecycleConfig;
pub use controller::{LifecycleController, TransitionOutcome, TransitionRequest};
pub use error::{LifecycleError, TransitionFailure};
pub use ledger::{AuditContext, AuditLedger};
pub use provisioning::{ProvisioningOrchestrator, SetupOutcome, SetupRun};
