// devenvtool/src/store/s3.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use crate::store::BlobStore;

/// aws-sdk-s3 backed blob store pointed at an S3-compatible endpoint
/// (MinIO in local development). Path-style addressing is required there.
pub struct S3BlobStore {
    client: s3::Client,
}

impl S3BlobStore {
    pub async fn connect(storage_config: &StorageConfig) -> Self {
        let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .endpoint_url(&storage_config.endpoint_url)
            .region(Region::new(storage_config.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &storage_config.access_key_id,
                &storage_config.secret_access_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ))
            .load()
            .await;

        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        S3BlobStore {
            client: s3::Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to put s3://{}/{}: {}", bucket, key, e))
            })?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("s3://{}/{}", bucket, key))
                } else {
                    AppError::Storage(format!(
                        "Failed to get s3://{}/{}: {}",
                        bucket, key, service_error
                    ))
                }
            })?;

        let data = object.body.collect().await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to read body of s3://{}/{}: {}",
                bucket, key, e
            ))
        })?;
        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AppError::Storage(format!("Failed to list bucket {}: {}", bucket, e))
            })?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to delete s3://{}/{}: {}", bucket, key, e))
            })?;
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to check bucket {}: {}",
                        bucket, service_error
                    )))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create bucket {}: {}", bucket, e)))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete bucket {}: {}", bucket, e)))?;
        Ok(())
    }
}
