// devenvtool/src/snapshot/mod.rs
pub mod logic;
pub mod manifest;

pub use logic::SnapshotManager;
pub use manifest::{SnapshotManifest, SnapshotSummary};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::registry::Registry;
use crate::store::postgres::PgQueryExecutor;
use crate::store::s3::S3BlobStore;

/// Entry point for `snapshot <name>`: captures every registered table and
/// bucket under the given name.
pub async fn run_snapshot_flow(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let registry = Registry::load(&config.registry_path, &config.data_dir)?;
    let executor = Arc::new(PgQueryExecutor::connect(&config.database_url).await?);
    let store = Arc::new(S3BlobStore::connect(&config.storage).await);

    let manager = SnapshotManager::new(executor, store, registry.clone(), &config.snapshot_bucket);
    let manifest = manager
        .create_snapshot(name, registry.tables(), registry.buckets())
        .await?;
    println!(
        "✅ Snapshot '{}' captured ({} tables, {} buckets)",
        manifest.name,
        manifest.tables.len(),
        manifest.buckets.len()
    );
    Ok(())
}

/// Entry point for `list`: prints stored snapshots, newest first.
pub async fn run_list_flow(config: &AppConfig) -> anyhow::Result<()> {
    let registry = Registry::load(&config.registry_path, &config.data_dir)?;
    let executor = Arc::new(PgQueryExecutor::connect(&config.database_url).await?);
    let store = Arc::new(S3BlobStore::connect(&config.storage).await);

    let manager = SnapshotManager::new(executor, store, registry, &config.snapshot_bucket);
    let summaries = manager.list_snapshots().await?;

    if summaries.is_empty() {
        println!("No snapshots stored yet.");
        return Ok(());
    }

    println!("📋 {} snapshot(s):", summaries.len());
    for summary in summaries {
        println!(
            "  {}  {}  ({} tables, {} buckets)",
            summary.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            summary.name,
            summary.tables,
            summary.buckets
        );
    }
    Ok(())
}
