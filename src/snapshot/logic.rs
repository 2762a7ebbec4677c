// devenvtool/src/snapshot/logic.rs
use chrono::Utc;
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::registry::{BucketSpec, Registry, TableSpec, quote_identifier};
use crate::reset::bucket_ops::BucketOperator;
use crate::reset::schema_ops::SchemaOperator;
use crate::reset::seed::{SeedBatch, SeedLoader};
use crate::snapshot::manifest::{
    BucketArtifact, SnapshotManifest, SnapshotSummary, TableArtifact, bucket_prefix, manifest_key,
    snapshot_prefix, table_dump_key,
};
use crate::store::{BlobStore, QueryExecutor};

/// Captures and restores named snapshots of table contents and bucket
/// contents. Artifacts live under a per-snapshot prefix in a dedicated
/// snapshot bucket; the manifest is written last, so a snapshot is never
/// partially visible.
pub struct SnapshotManager {
    store: Arc<dyn BlobStore>,
    registry: Registry,
    snapshot_bucket: String,
    schema: SchemaOperator,
    seeder: SeedLoader,
    buckets: BucketOperator,
    executor: Arc<dyn QueryExecutor>,
}

impl SnapshotManager {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        store: Arc<dyn BlobStore>,
        registry: Registry,
        snapshot_bucket: &str,
    ) -> Self {
        SnapshotManager {
            schema: SchemaOperator::new(executor.clone()),
            seeder: SeedLoader::new(executor.clone()),
            buckets: BucketOperator::new(store.clone()),
            store,
            registry,
            snapshot_bucket: snapshot_bucket.to_string(),
            executor,
        }
    }

    /// Dumps the given tables and buckets under a new snapshot name. On any
    /// failure every artifact already written for this name is deleted
    /// before the error is returned.
    pub async fn create_snapshot(
        &self,
        name: &str,
        tables: &[TableSpec],
        buckets: &[BucketSpec],
    ) -> Result<SnapshotManifest> {
        validate_name(name)?;
        self.buckets.ensure(&self.snapshot_bucket).await?;

        match self.store.get(&self.snapshot_bucket, &manifest_key(name)).await {
            Ok(_) => {
                return Err(AppError::Snapshot {
                    name: name.to_string(),
                    message: "a snapshot with this name already exists (snapshots are immutable)"
                        .to_string(),
                });
            }
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        println!("📸 Creating snapshot '{}'", name);
        match self.try_create(name, tables, buckets).await {
            Ok(manifest) => {
                println!("✅ Snapshot '{}' written", name);
                Ok(manifest)
            }
            Err(cause) => Err(self.clean_up_failed(name, cause).await),
        }
    }

    async fn try_create(
        &self,
        name: &str,
        tables: &[TableSpec],
        buckets: &[BucketSpec],
    ) -> Result<SnapshotManifest> {
        let manifest = self.write_artifacts(name, tables, buckets).await?;
        let body = serde_json::to_vec_pretty(&manifest)?;
        self.store
            .put(&self.snapshot_bucket, &manifest_key(name), body)
            .await?;
        Ok(manifest)
    }

    /// Best-effort removal of partial artifacts after a failed create. The
    /// returned error always names the snapshot and carries the original
    /// cause; a cleanup failure is appended, never substituted.
    async fn clean_up_failed(&self, name: &str, cause: AppError) -> AppError {
        let message = match self.delete_artifacts(name).await {
            Ok(()) => cause.to_string(),
            Err(cleanup) => format!(
                "{}; cleanup of partial artifacts also failed, leftovers remain under '{}': {}",
                cause,
                snapshot_prefix(name),
                cleanup
            ),
        };
        AppError::Snapshot {
            name: name.to_string(),
            message,
        }
    }

    async fn write_artifacts(
        &self,
        name: &str,
        tables: &[TableSpec],
        buckets: &[BucketSpec],
    ) -> Result<SnapshotManifest> {
        let mut table_artifacts: Vec<TableArtifact> = Vec::with_capacity(tables.len());
        for table in tables {
            let dump = self.dump_table(&table.name).await?;
            let rows = dump.rows.len() as u64;
            let key = table_dump_key(name, &table.name);
            self.store
                .put(&self.snapshot_bucket, &key, serde_json::to_vec(&dump)?)
                .await?;
            table_artifacts.push(TableArtifact {
                table: table.name.clone(),
                key,
                rows,
            });
        }

        let mut bucket_artifacts: Vec<BucketArtifact> = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let prefix = bucket_prefix(name, &bucket.name);
            let keys = if self.store.bucket_exists(&bucket.name).await? {
                self.store.list(&bucket.name, "").await?
            } else {
                // absent bucket snapshots as empty
                Vec::new()
            };

            for key in &keys {
                let bytes = self.store.get(&bucket.name, key).await?;
                self.store
                    .put(&self.snapshot_bucket, &format!("{}{}", prefix, key), bytes)
                    .await?;
            }

            bucket_artifacts.push(BucketArtifact {
                bucket: bucket.name.clone(),
                prefix,
                keys,
            });
        }

        Ok(SnapshotManifest {
            name: name.to_string(),
            created_at: Utc::now(),
            tables: table_artifacts,
            buckets: bucket_artifacts,
        })
    }

    /// All rows of a table in first-column order, rendered as a seedable
    /// batch.
    async fn dump_table(&self, table: &str) -> Result<SeedBatch> {
        let sql = format!("SELECT * FROM {} ORDER BY 1", quote_identifier(table));
        let output = self.executor.execute(&sql, &[]).await?;
        Ok(SeedBatch {
            columns: output.columns,
            rows: output.rows,
        })
    }

    /// Deletes as many of the snapshot's keys as possible; the first delete
    /// failure is reported after the remaining keys have been attempted.
    async fn delete_artifacts(&self, name: &str) -> Result<()> {
        let keys = self
            .store
            .list(&self.snapshot_bucket, &snapshot_prefix(name))
            .await?;

        let mut first_failure: Option<AppError> = None;
        for key in keys {
            if let Err(e) = self.store.delete(&self.snapshot_bucket, &key).await {
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Replays a snapshot: per referenced table, drop + recreate + bulk
    /// insert; per referenced bucket, recreate + repopulate. Units restore
    /// sequentially — a failure at unit k leaves units 1..k-1 restored and
    /// k..n untouched, and the error names the failing unit.
    pub async fn restore_snapshot(&self, name: &str) -> Result<()> {
        let manifest = self.load_manifest(name).await?;
        println!("🔄 Restoring snapshot '{}'", name);

        for artifact in &manifest.tables {
            self.restore_table(name, artifact.table.as_str(), &artifact.key)
                .await
                .map_err(|e| AppError::Snapshot {
                    name: name.to_string(),
                    message: format!("restore halted at table '{}': {}", artifact.table, e),
                })?;
        }

        for artifact in &manifest.buckets {
            self.restore_bucket(artifact)
                .await
                .map_err(|e| AppError::Snapshot {
                    name: name.to_string(),
                    message: format!("restore halted at bucket '{}': {}", artifact.bucket, e),
                })?;
        }

        println!("✅ Snapshot '{}' restored", name);
        Ok(())
    }

    async fn restore_table(&self, name: &str, table: &str, dump_key: &str) -> Result<()> {
        let spec = self.registry.table(table).ok_or_else(|| {
            AppError::NotFound(format!(
                "table '{}' referenced by snapshot '{}' is not in the registry",
                table, name
            ))
        })?;

        let bytes = self.store.get(&self.snapshot_bucket, dump_key).await?;
        let dump: SeedBatch = serde_json::from_slice(&bytes)?;

        self.schema.drop_table(table).await?;
        self.schema.create_table(spec).await?;
        self.seeder
            .insert_rows(table, &dump.columns, &dump.rows)
            .await?;
        Ok(())
    }

    async fn restore_bucket(&self, artifact: &BucketArtifact) -> Result<()> {
        self.buckets.recreate(&artifact.bucket).await?;
        for key in &artifact.keys {
            let bytes = self
                .store
                .get(&self.snapshot_bucket, &format!("{}{}", artifact.prefix, key))
                .await?;
            self.store.put(&artifact.bucket, key, bytes).await?;
        }
        Ok(())
    }

    async fn load_manifest(&self, name: &str) -> Result<SnapshotManifest> {
        validate_name(name)?;
        if !self.store.bucket_exists(&self.snapshot_bucket).await? {
            return Err(AppError::NotFound(format!("snapshot '{}'", name)));
        }
        let bytes = self
            .store
            .get(&self.snapshot_bucket, &manifest_key(name))
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(format!("snapshot '{}'", name)),
                other => other,
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Summaries of every stored snapshot, newest first.
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>> {
        if !self.store.bucket_exists(&self.snapshot_bucket).await? {
            return Ok(Vec::new());
        }

        let mut summaries: Vec<SnapshotSummary> = Vec::new();
        for key in self.store.list(&self.snapshot_bucket, "").await? {
            if !key.ends_with("/manifest.json") {
                continue;
            }
            let bytes = self.store.get(&self.snapshot_bucket, &key).await?;
            let manifest: SnapshotManifest = serde_json::from_slice(&bytes)?;
            summaries.push(manifest.summary());
        }

        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(AppError::Snapshot {
            name: name.to_string(),
            message: "snapshot names must be non-empty and must not contain '/'".to_string(),
        });
    }
    Ok(())
}
