// devenvtool/src/reset/bucket_ops.rs
use std::sync::Arc;

use crate::errors::Result;
use crate::store::BlobStore;

/// Empties and recreates buckets through the blob store. Both operations
/// treat an absent bucket as a valid starting point.
pub struct BucketOperator {
    store: Arc<dyn BlobStore>,
}

impl BucketOperator {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        BucketOperator { store }
    }

    /// Deletes every object in the bucket. An already-empty or nonexistent
    /// bucket is success. Returns the number of objects deleted.
    pub async fn empty(&self, bucket: &str) -> Result<usize> {
        if !self.store.bucket_exists(bucket).await? {
            return Ok(0);
        }

        let keys = self.store.list(bucket, "").await?;
        for key in &keys {
            self.store.delete(bucket, key).await?;
        }

        if !keys.is_empty() {
            println!("🧹 Emptied bucket {} ({} objects)", bucket, keys.len());
        }
        Ok(keys.len())
    }

    /// Deletes the bucket if present (emptying it first), then creates it
    /// fresh.
    pub async fn recreate(&self, bucket: &str) -> Result<()> {
        if self.store.bucket_exists(bucket).await? {
            self.empty(bucket).await?;
            self.store.delete_bucket(bucket).await?;
        }
        self.store.create_bucket(bucket).await?;
        println!("🪣 Recreated bucket {}", bucket);
        Ok(())
    }

    /// Creates the bucket only if it does not exist yet.
    pub async fn ensure(&self, bucket: &str) -> Result<()> {
        if !self.store.bucket_exists(bucket).await? {
            self.store.create_bucket(bucket).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MemoryBlobStore;

    #[tokio::test]
    async fn test_empty_nonexistent_bucket_is_success() -> Result<()> {
        let store = Arc::new(MemoryBlobStore::new());
        let operator = BucketOperator::new(store);

        assert_eq!(operator.empty("missing").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_removes_all_objects_and_is_idempotent() -> Result<()> {
        let store = Arc::new(
            MemoryBlobStore::new()
                .with_object("uploads", "a.txt", b"aaa")
                .with_object("uploads", "nested/b.bin", b"bbb"),
        );
        let operator = BucketOperator::new(store.clone());

        assert_eq!(operator.empty("uploads").await?, 2);
        assert!(store.objects("uploads").is_empty());

        // empty bucket stays empty, no error
        assert_eq!(operator.empty("uploads").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_recreate_replaces_existing_bucket() -> Result<()> {
        let store = Arc::new(MemoryBlobStore::new().with_object("uploads", "stale.txt", b"old"));
        let operator = BucketOperator::new(store.clone());

        operator.recreate("uploads").await?;

        assert!(store.bucket_names().contains(&"uploads".to_string()));
        assert!(store.objects("uploads").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_recreate_creates_missing_bucket() -> Result<()> {
        let store = Arc::new(MemoryBlobStore::new());
        let operator = BucketOperator::new(store.clone());

        operator.recreate("uploads").await?;
        assert!(store.bucket_names().contains(&"uploads".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_does_not_clobber_existing_objects() -> Result<()> {
        let store = Arc::new(MemoryBlobStore::new().with_object("snapshots", "keep.json", b"{}"));
        let operator = BucketOperator::new(store.clone());

        operator.ensure("snapshots").await?;
        assert!(store.objects("snapshots").contains_key("keep.json"));

        operator.ensure("fresh").await?;
        assert!(store.bucket_names().contains(&"fresh".to_string()));
        Ok(())
    }
}
