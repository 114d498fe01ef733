#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Batch Background Removal
//!
//! Downloads images from an S3-compatible bucket, sends each one to a remote
//! background removal API and writes the resulting PNGs below a local output
//! directory that mirrors the bucket layout.
//!
//! Runs are resumable: an item whose output file already exists is skipped
//! without touching storage or the API, so re-running after a partial
//! failure only processes what is missing.
//!
//! ## Pipeline
//!
//! - [`BatchDriver`] lists the configured prefix, keeps PNG/WebP/JPEG keys,
//!   reverses their order and processes them one at a time with a fixed pause
//!   in between. A failing item is logged and the batch continues.
//! - [`ItemProcessor`] derives the output path, skips existing outputs and
//!   otherwise runs fetch → removal → atomic write.
//! - [`RemovalClient`] posts a fresh multipart body per attempt and retries
//!   HTTP 429 responses with jittered exponential backoff.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use bgremove_batch::{BatchConfig, BatchDriver};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BatchConfig::from_env()?;
//! let driver = BatchDriver::from_config(&config)?;
//! let summary = driver.run().await?;
//! println!("{} found, {} failed", summary.found, summary.failed());
//! # Ok(())
//! # }
//! ```
//!
//! Storage and the removal API sit behind the [`StorageGateway`] and
//! [`BackgroundRemover`] traits, so either can be swapped via
//! [`BatchDriver::new`].

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod processor;
pub mod removal;
pub mod storage;
pub mod tracing_config;

pub use batch::{BatchDriver, BatchProgress, BatchSummary, FailedItem, NoOpBatchProgress};
pub use config::{BatchConfig, BatchConfigBuilder, Credentials};
pub use error::{BatchError, Result};
pub use paths::{is_supported_image, OutputLayout, CANONICAL_EXTENSION};
pub use processor::{ItemOutcome, ItemProcessor};
pub use removal::{BackgroundRemover, RemovalClient};
pub use storage::{S3Gateway, StorageGateway};
pub use tracing_config::{TracingConfig, TracingFormat};
