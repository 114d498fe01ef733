//! Shared test doubles for storage and the removal API

#![allow(dead_code)]

use async_trait::async_trait;
use bgremove_batch::{BackgroundRemover, BatchConfig, BatchError, Result, StorageGateway};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory bucket that records every call
#[derive(Default)]
pub struct MemoryStorage {
    keys: Vec<String>,
    objects: HashMap<String, Vec<u8>>,
    fail_listing: bool,
    gets: Mutex<Vec<String>>,
    lists: Mutex<Vec<String>>,
}

impl MemoryStorage {
    /// Bucket listing `keys` in the given order, each with a small body
    pub fn with_keys(keys: &[&str]) -> Self {
        let mut storage = Self::default();
        for key in keys {
            storage.keys.push((*key).to_string());
            storage
                .objects
                .insert((*key).to_string(), format!("IMG:{key}").into_bytes());
        }
        storage
    }

    /// Bucket whose listing call always fails
    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    /// Make `key` listed but without a retrievable body
    pub fn without_body(mut self, key: &str) -> Self {
        self.objects.remove(key);
        self
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn lists(&self) -> Vec<String> {
        self.lists.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.lists.lock().unwrap().push(prefix.to_string());
        if self.fail_listing {
            return Err(BatchError::storage("listing unavailable"));
        }
        Ok(self
            .keys
            .iter()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.gets.lock().unwrap().push(key.to_string());
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| BatchError::fetch(key, "storage returned an empty body"))
    }
}

/// Removal API double returning `PNG:` followed by the input bytes
#[derive(Default)]
pub struct FakeRemover {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRemover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject submissions whose display name is `key` with a 400
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    async fn submit(&self, image: &[u8], display_name: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(display_name.to_string());
        if self.failing.contains(display_name) {
            return Err(BatchError::Api {
                status: 400,
                status_text: "Bad Request".to_string(),
                message: "could not identify foreground".to_string(),
                body: "could not identify foreground".to_string(),
            });
        }
        let mut out = b"PNG:".to_vec();
        out.extend_from_slice(image);
        Ok(out)
    }
}

/// Validated config for prefix `a/` writing below `output_root`, no pacing
pub fn test_config(output_root: &Path) -> BatchConfig {
    BatchConfig::builder()
        .api_key("test-key")
        .folder_prefix("a/")
        .output_root(output_root)
        .pacing_delay(Duration::ZERO)
        .build()
        .expect("test config should be valid")
}
