//! Resumable per-item processing
//!
//! An item is one object key. Processing it either finds the output file
//! already present and does nothing, or fetches the image, removes its
//! background and writes the result to the derived output path.

use crate::error::{BatchError, Result};
use crate::paths::OutputLayout;
use crate::removal::BackgroundRemover;
use crate::storage::StorageGateway;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What processing a single key did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Output already existed; nothing was fetched, submitted or written
    Skipped(PathBuf),
    /// A processed image of `bytes` bytes was written to `path`
    Written { path: PathBuf, bytes: usize },
}

impl ItemOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Skipped(path) | Self::Written { path, .. } => path,
        }
    }
}

/// Fetch → remove background → store, skipping keys whose output exists
pub struct ItemProcessor {
    storage: Arc<dyn StorageGateway>,
    remover: Arc<dyn BackgroundRemover>,
    layout: OutputLayout,
}

impl ItemProcessor {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        remover: Arc<dyn BackgroundRemover>,
        layout: OutputLayout,
    ) -> Self {
        Self {
            storage,
            remover,
            layout,
        }
    }

    /// Process one object key
    ///
    /// # Errors
    /// - Output existence could not be determined
    /// - Fetching the object failed or returned no body
    /// - The removal API rejected the image or stayed rate limited
    /// - Creating the output directory or writing the file failed
    pub async fn process(&self, key: &str) -> Result<ItemOutcome> {
        let output_path = self.layout.output_path(key);

        let exists = tokio::fs::try_exists(&output_path)
            .await
            .map_err(|e| BatchError::file_io_error("check output", &output_path, &e))?;
        if exists {
            info!(key = %key, path = %output_path.display(), "⏭️  Skipping, output already exists");
            return Ok(ItemOutcome::Skipped(output_path));
        }

        let image = self.storage.get(key).await.map_err(|e| {
            error!(key = %key, error = %e, "Failed to download image");
            e
        })?;
        debug!(key = %key, bytes = image.len(), "Downloaded image");

        let processed = self.remover.submit(&image, key).await.map_err(|e| {
            error!(key = %key, error = %e, "Background removal failed");
            e
        })?;

        write_atomically(&output_path, &processed).await?;

        info!(key = %key, path = %output_path.display(), "✅ Saved processed image");
        Ok(ItemOutcome::Written {
            path: output_path,
            bytes: processed.len(),
        })
    }
}

/// Sibling path the output is staged at before it is renamed into place
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Write `data` so that `path` either does not exist or holds all of it
async fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BatchError::file_io_error("create directory", parent, &e))?;
    }

    let partial = partial_path(path);
    tokio::fs::write(&partial, data)
        .await
        .map_err(|e| BatchError::file_io_error("write file", &partial, &e))?;

    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| BatchError::file_io_error("move file into place", path, &e))?;

    Ok(())
}
