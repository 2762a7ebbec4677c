// devenvtool/src/reset/logic.rs
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::registry::Registry;
use crate::reset::bucket_ops::BucketOperator;
use crate::reset::plan::{OperationPlan, Phase, RunOutcome, RunReport, Step};
use crate::reset::schema_ops::SchemaOperator;
use crate::reset::seed::SeedLoader;
use crate::snapshot::SnapshotManager;
use crate::store::{BlobStore, QueryExecutor};

/// Drives a full run over the operation plan. Steps execute strictly in plan
/// order; the first failure halts the run and the report carries everything
/// that completed before it. Errors never cross this boundary as `Err` — the
/// caller always gets a report.
pub struct ResetOrchestrator {
    registry: Registry,
    schema: SchemaOperator,
    seeder: SeedLoader,
    buckets: BucketOperator,
    snapshots: SnapshotManager,
}

impl ResetOrchestrator {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        store: Arc<dyn BlobStore>,
        registry: Registry,
        snapshot_bucket: &str,
    ) -> Self {
        ResetOrchestrator {
            schema: SchemaOperator::new(executor.clone()),
            seeder: SeedLoader::new(executor.clone()),
            buckets: BucketOperator::new(store.clone()),
            snapshots: SnapshotManager::new(executor, store, registry.clone(), snapshot_bucket),
            registry,
        }
    }

    /// Baseline reset, or a snapshot restore when a name is given.
    pub async fn reset_all(&self, snapshot: Option<&str>) -> RunReport {
        let plan = OperationPlan::build(&self.registry, snapshot);
        println!("🚀 {}: {} step(s)", Phase::Planning, plan.steps.len());

        let mut completed: Vec<Step> = Vec::new();
        let mut current_phase: Option<Phase> = None;

        for step in plan.steps {
            let phase = step.phase();
            if current_phase != Some(phase) {
                println!("▶️  {}", phase);
                current_phase = Some(phase);
            }

            if let Err(error) = self.run_step(&step).await {
                println!("❌ {} while {}: {}", Phase::Failed, phase, error);
                return RunReport {
                    completed,
                    outcome: RunOutcome::Failed { step, phase, error },
                };
            }
            completed.push(step);
        }

        println!("✅ {} ({} step(s))", Phase::Done, completed.len());
        RunReport {
            completed,
            outcome: RunOutcome::Done,
        }
    }

    async fn run_step(&self, step: &Step) -> Result<()> {
        match step {
            Step::DropTable(table) => self.schema.drop_table(table).await,
            Step::CreateTable(table) => {
                let spec = self.table_spec(table)?;
                self.schema.create_table(spec).await
            }
            Step::SeedTable(table) => {
                let spec = self.table_spec(table)?;
                self.seeder.seed(spec).await.map(|_| ())
            }
            Step::EmptyBucket(bucket) => self.buckets.empty(bucket).await.map(|_| ()),
            Step::RecreateBucket(bucket) => self.buckets.recreate(bucket).await,
            Step::RestoreSnapshot(name) => self.snapshots.restore_snapshot(name).await,
        }
    }

    fn table_spec(&self, table: &str) -> Result<&crate::registry::TableSpec> {
        self.registry
            .table(table)
            .ok_or_else(|| AppError::NotFound(format!("table '{}' is not in the registry", table)))
    }
}
