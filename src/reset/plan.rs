// devenvtool/src/reset/plan.rs
use std::fmt;

use crate::errors::AppError;
use crate::registry::Registry;

/// One atomic unit of work in a run. Plans are derived fresh from the
/// registry on every invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    DropTable(String),
    CreateTable(String),
    SeedTable(String),
    EmptyBucket(String),
    RecreateBucket(String),
    RestoreSnapshot(String),
}

impl Step {
    pub fn phase(&self) -> Phase {
        match self {
            Step::DropTable(_) => Phase::DroppingTables,
            Step::CreateTable(_) => Phase::CreatingTables,
            Step::SeedTable(_) => Phase::Seeding,
            Step::EmptyBucket(_) => Phase::EmptyingBuckets,
            Step::RecreateBucket(_) => Phase::RecreatingBuckets,
            Step::RestoreSnapshot(_) => Phase::RestoringSnapshot,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::DropTable(t) => write!(f, "drop table {}", t),
            Step::CreateTable(t) => write!(f, "create table {}", t),
            Step::SeedTable(t) => write!(f, "seed table {}", t),
            Step::EmptyBucket(b) => write!(f, "empty bucket {}", b),
            Step::RecreateBucket(b) => write!(f, "recreate bucket {}", b),
            Step::RestoreSnapshot(n) => write!(f, "restore snapshot {}", n),
        }
    }
}

/// States a run moves through. A baseline reset walks the table phases then
/// the bucket phases; a snapshot run goes straight to RestoringSnapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    DroppingTables,
    CreatingTables,
    Seeding,
    EmptyingBuckets,
    RecreatingBuckets,
    RestoringSnapshot,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Planning => "planning",
            Phase::DroppingTables => "dropping tables",
            Phase::CreatingTables => "creating tables",
            Phase::Seeding => "seeding",
            Phase::EmptyingBuckets => "emptying buckets",
            Phase::RecreatingBuckets => "recreating buckets",
            Phase::RestoringSnapshot => "restoring snapshot",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    pub steps: Vec<Step>,
}

impl OperationPlan {
    /// Baseline reset: drop in reverse dependency order, create and seed in
    /// dependency order, then empty and recreate every bucket. When a
    /// snapshot name is given the plan collapses to a single restore step.
    pub fn build(registry: &Registry, snapshot: Option<&str>) -> Self {
        if let Some(name) = snapshot {
            return OperationPlan {
                steps: vec![Step::RestoreSnapshot(name.to_string())],
            };
        }

        let mut steps: Vec<Step> = Vec::new();

        for table in registry.tables_reverse() {
            steps.push(Step::DropTable(table.name.clone()));
        }
        for table in registry.tables() {
            steps.push(Step::CreateTable(table.name.clone()));
        }
        for table in registry.tables() {
            if table.seed.is_some() {
                steps.push(Step::SeedTable(table.name.clone()));
            }
        }
        for bucket in registry.buckets() {
            steps.push(Step::EmptyBucket(bucket.name.clone()));
        }
        for bucket in registry.buckets() {
            steps.push(Step::RecreateBucket(bucket.name.clone()));
        }

        OperationPlan { steps }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Done,
    Failed {
        step: Step,
        phase: Phase,
        error: AppError,
    },
}

/// Structured step-by-step result of a run. The orchestrator accumulates
/// completed steps instead of letting errors cross its boundary, so a failed
/// run still reports everything that finished.
#[derive(Debug)]
pub struct RunReport {
    pub completed: Vec<Step>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Done)
    }
}
