// devenvtool/src/reset/mod.rs
pub mod bucket_ops;
pub mod logic;
pub mod plan;
pub mod schema_ops;
pub mod seed;

pub use logic::ResetOrchestrator;
pub use plan::{OperationPlan, Phase, RunOutcome, RunReport, Step};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::registry::Registry;
use crate::store::postgres::PgQueryExecutor;
use crate::store::s3::S3BlobStore;

/// Entry point for `reset` / `restore <name>`: connects the real stores,
/// loads the registry, and drives a full run.
pub async fn run_reset_flow(
    config: &AppConfig,
    snapshot: Option<&str>,
) -> anyhow::Result<RunReport> {
    let registry = Registry::load(&config.registry_path, &config.data_dir)?;
    let executor = Arc::new(PgQueryExecutor::connect(&config.database_url).await?);
    let store = Arc::new(S3BlobStore::connect(&config.storage).await);

    let orchestrator =
        ResetOrchestrator::new(executor, store, registry, &config.snapshot_bucket);
    Ok(orchestrator.reset_all(snapshot).await)
}
