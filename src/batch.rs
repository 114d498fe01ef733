//! Batch driver
//!
//! Discovers the image keys under the configured prefix and processes them
//! one at a time in reverse listing order. A failing item is logged and
//! recorded; the batch moves on to the next key.

use crate::config::BatchConfig;
use crate::error::Result;
use crate::paths::{is_supported_image, OutputLayout};
use crate::processor::{ItemOutcome, ItemProcessor};
use crate::removal::{BackgroundRemover, RemovalClient};
use crate::storage::{S3Gateway, StorageGateway};
use crate::tracing_config::spans;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// A key that could not be processed, with the rendered error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub key: String,
    pub error: String,
}

/// Outcome counts of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Image keys discovered, i.e. items attempted
    pub found: usize,
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<FailedItem>,
}

impl BatchSummary {
    pub fn new(found: usize) -> Self {
        Self {
            found,
            ..Self::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn record(&mut self, key: &str, result: &Result<ItemOutcome>) {
        match result {
            Ok(ItemOutcome::Written { .. }) => self.written += 1,
            Ok(ItemOutcome::Skipped(_)) => self.skipped += 1,
            Err(e) => self.failures.push(FailedItem {
                key: key.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

/// Observer notified as the batch advances
pub trait BatchProgress: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_item(&self, _index: usize, _key: &str, _result: &Result<ItemOutcome>) {}

    fn on_finish(&self, _summary: &BatchSummary) {}
}

/// Progress observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpBatchProgress;

impl BatchProgress for NoOpBatchProgress {}

/// Keep supported image keys and reverse their listing order
pub fn select_keys(listed: Vec<String>) -> Vec<String> {
    let mut keys: Vec<String> = listed
        .into_iter()
        .filter(|key| {
            let keep = is_supported_image(key);
            if !keep {
                debug!(key = %key, "Ignoring non-image object");
            }
            keep
        })
        .collect();
    keys.reverse();
    keys
}

pub struct BatchDriver {
    storage: Arc<dyn StorageGateway>,
    processor: ItemProcessor,
    folder_prefix: String,
    pacing_delay: Duration,
}

impl BatchDriver {
    pub fn new(
        config: &BatchConfig,
        storage: Arc<dyn StorageGateway>,
        remover: Arc<dyn BackgroundRemover>,
    ) -> Self {
        let layout = OutputLayout::new(config.folder_prefix.clone(), config.output_root.clone());
        Self {
            processor: ItemProcessor::new(Arc::clone(&storage), remover, layout),
            storage,
            folder_prefix: config.folder_prefix.clone(),
            pacing_delay: config.pacing_delay,
        }
    }

    /// Wire the S3 gateway and the removal API client from `config`
    ///
    /// # Errors
    /// - Configuration is invalid (for example no removal API key)
    /// - Failed to create HTTP client
    pub fn from_config(config: &BatchConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn StorageGateway> = Arc::new(S3Gateway::from_config(config));
        let remover: Arc<dyn BackgroundRemover> = Arc::new(RemovalClient::new(config)?);
        Ok(Self::new(config, storage, remover))
    }

    pub fn processor(&self) -> &ItemProcessor {
        &self.processor
    }

    /// Image keys to process, in processing order
    ///
    /// # Errors
    /// - Listing the bucket failed
    pub async fn discover(&self) -> Result<Vec<String>> {
        let listed = self.storage.list(&self.folder_prefix).await?;
        let listed_count = listed.len();
        let keys = select_keys(listed);
        debug!(
            prefix = %self.folder_prefix,
            listed = listed_count,
            images = keys.len(),
            "Discovered objects"
        );
        Ok(keys)
    }

    /// Run the batch without progress reporting
    ///
    /// # Errors
    /// See [`BatchDriver::run_with_progress`]
    pub async fn run(&self) -> Result<BatchSummary> {
        self.run_with_progress(&NoOpBatchProgress).await
    }

    /// Process every discovered key, pausing between consecutive items
    ///
    /// # Errors
    /// - Listing the bucket failed
    /// - An item failed with a configuration error; other item errors are
    ///   recorded in the summary instead
    pub async fn run_with_progress(&self, progress: &dyn BatchProgress) -> Result<BatchSummary> {
        let keys = self.discover().await?;
        let batch_start_time = Instant::now();

        if keys.is_empty() {
            warn!(prefix = %self.folder_prefix, "No images found under prefix");
        } else {
            info!("Found {} image(s) to process", keys.len());
        }

        let mut summary = BatchSummary::new(keys.len());
        progress.on_start(keys.len());

        for (index, key) in keys.iter().enumerate() {
            if index > 0 && !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }

            info!("Processing {}/{}: {}", index + 1, keys.len(), key);
            let result = match self
                .processor
                .process(key)
                .instrument(spans::item(index, key))
                .await
            {
                Err(e) if e.is_fatal() => {
                    error!(key = %key, error = %e, "Aborting batch");
                    return Err(e);
                },
                other => other,
            };

            if let Err(e) = &result {
                error!(key = %key, error = %e, "❌ Failed to process image");
            }

            summary.record(key, &result);
            progress.on_item(index, key, &result);
        }

        progress.on_finish(&summary);
        log_summary(&summary, batch_start_time.elapsed());

        Ok(summary)
    }
}

fn log_summary(summary: &BatchSummary, elapsed: Duration) {
    info!("📊 Batch processing summary:");
    info!("  ├─ Images found: {}", summary.found);
    info!("  ├─ Written: {}", summary.written);
    info!("  ├─ Skipped (already done): {}", summary.skipped);
    info!("  ├─ Failed: {}", summary.failed());
    info!("  └─ Total time: {:.2}s", elapsed.as_secs_f64());

    if summary.failed() > 0 {
        warn!(
            "Some images failed to process: {}",
            summary
                .failures
                .iter()
                .map(|item| item.key.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
