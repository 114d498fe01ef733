//! S3-compatible storage gateway

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::storage::StorageGateway;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

pub struct S3Gateway {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Gateway {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_owned(),
        }
    }

    /// Build a client for the configured endpoint, region and static credentials
    pub fn from_config(config: &BatchConfig) -> Self {
        let cred = aws_sdk_s3::config::Credentials::new(
            config.credentials.storage_access_key.clone(),
            config.credentials.storage_secret_key.clone(),
            None,
            None,
            "loaded-from-custom-env",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .endpoint_url(config.storage_endpoint.clone())
            .credentials_provider(cred)
            .region(aws_sdk_s3::config::Region::new(config.storage_region.clone()))
            .behavior_version_latest()
            .build();

        Self::new(aws_sdk_s3::Client::from_conf(s3_config), &config.bucket)
    }
}

#[async_trait]
impl StorageGateway for S3Gateway {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(self.bucket.as_str())
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                BatchError::storage(format!(
                    "failed to list s3://{}/{}: {}",
                    self.bucket,
                    prefix,
                    DisplayErrorContext(&e)
                ))
            })?;
            page_count += 1;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_owned)),
            );
        }

        debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            pages = page_count,
            keys = keys.len(),
            "listed objects"
        );

        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        debug!("downloading object: {} from bucket: {}", key, self.bucket);

        let object = self
            .client
            .get_object()
            .bucket(self.bucket.as_str())
            .key(key)
            .send()
            .await
            .map_err(|e| BatchError::fetch(key, DisplayErrorContext(&e).to_string()))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| BatchError::fetch(key, format!("failed to read body: {e}")))?
            .into_bytes();

        if data.is_empty() {
            return Err(BatchError::fetch(key, "storage returned an empty body"));
        }

        Ok(data.to_vec())
    }
}
