// devenvtool/src/store/mod.rs
//
// External collaborator seams. The reset/snapshot pipeline only ever talks to
// the database and the object store through these traits, which keeps the
// orchestration logic testable against in-memory fakes.

pub mod postgres;
pub mod s3;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::errors::Result;

/// Result of a query: column names plus rows rendered as nullable text, the
/// same shape the tool uses for seed fixtures and snapshot dumps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub rowcount: u64,
}

/// Executes parameterized SQL against the relational store. Parameters bind
/// positionally ($1, $2, ...) as nullable text. begin/commit/rollback scope a
/// single transaction; nesting is not supported (single-operator tool).
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<QueryOutput>;
    async fn begin(&self) -> Result<()>;
    async fn commit(&self) -> Result<()>;
    async fn rollback(&self) -> Result<()>;
}

/// Put/get/list/delete objects by bucket and key, plus bucket lifecycle.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    /// Keys under the prefix, lexicographically ordered.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
    async fn create_bucket(&self, bucket: &str) -> Result<()>;
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}
