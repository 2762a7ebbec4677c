// devenvtool/src/snapshot/manifest.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row-dump artifact for one table in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableArtifact {
    pub table: String,
    /// Object key of the dump inside the snapshot bucket.
    pub key: String,
    pub rows: u64,
}

/// Object-copy artifact set for one bucket in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketArtifact {
    pub bucket: String,
    /// Snapshot-scoped key prefix the objects were copied under.
    pub prefix: String,
    /// Original object keys; artifact key = prefix + original key.
    pub keys: Vec<String>,
}

/// Immutable description of a stored snapshot. Written only after every
/// artifact it references exists; restoring never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tables: Vec<TableArtifact>,
    pub buckets: Vec<BucketArtifact>,
}

impl SnapshotManifest {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            name: self.name.clone(),
            created_at: self.created_at,
            tables: self.tables.len(),
            buckets: self.buckets.len(),
        }
    }
}

/// Listing entry for an operator-facing snapshot overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tables: usize,
    pub buckets: usize,
}

// Key layout inside the snapshot bucket:
//   <name>/manifest.json
//   <name>/tables/<table>.json
//   <name>/objects/<bucket>/<original key>

pub fn manifest_key(name: &str) -> String {
    format!("{}/manifest.json", name)
}

pub fn table_dump_key(name: &str, table: &str) -> String {
    format!("{}/tables/{}.json", name, table)
}

pub fn bucket_prefix(name: &str, bucket: &str) -> String {
    format!("{}/objects/{}/", name, bucket)
}

pub fn snapshot_prefix(name: &str) -> String {
    format!("{}/", name)
}
