//! FPO registry server: application entry point.
//!
//! Wires the lifecycle controller to SurrealDB and the external
//! access-control service, then runs until interrupted. Request routing
//! is provided by the embedding gateway.

mod config;
mod error;

use fpo_access::HttpAccessControlClient;
use fpo_core::models::organization::OrgStatus;
use fpo_core::repository::{OrganizationRepository, Pagination};
use fpo_db::DbManager;
use fpo_lifecycle::LifecycleController;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fpo=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!("Starting FPO registry server...");

    if let Err(e) = run().await {
        error!(error = %e, "FPO registry server failed");
        std::process::exit(1);
    }

    info!("FPO registry server stopped.");
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db).await?;
    db.migrate().await?;

    let access = HttpAccessControlClient::new(config.access.clone())?;
    let controller = LifecycleController::new(
        db.organizations(),
        db.audit_log(),
        access.clone(),
        access,
        config.lifecycle.clone(),
    );

    report_stalled_setups(&db).await?;

    info!(
        max_setup_attempts = controller.config().max_setup_attempts,
        step_timeout_ms = controller.config().step_timeout_ms,
        permission_timeout_ms = controller.config().permission_timeout_ms,
        access_base_url = %config.access.base_url,
        "Lifecycle controller ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}

/// Log organizations left in `SETUP_FAILED`, which need a retry, an
/// override or archival.
async fn report_stalled_setups(db: &DbManager) -> Result<(), ServerError> {
    let stalled = db
        .organizations()
        .list(Some(OrgStatus::SetupFailed), Pagination::default())
        .await
        .map_err(|e| ServerError::Startup(e.to_string()))?;

    if stalled.total > 0 {
        warn!(count = stalled.total, "Organizations awaiting setup retry");
        for org in &stalled.items {
            warn!(
                org_id = %org.id,
                name = %org.name,
                setup_attempts = org.setup_attempts,
                "Setup failed"
            );
        }
    }
    Ok(())
}
