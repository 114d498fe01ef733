//! Configuration for batch background removal runs
//!
//! A [`BatchConfig`] is constructed once at startup, either from the
//! environment via [`BatchConfig::from_env`] or through the builder, and is
//! then handed to the storage gateway, the removal client and the batch driver.

use crate::error::{BatchError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// S3-compatible endpoint the source bucket lives on
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://nyc3.digitaloceanspaces.com";

/// Region passed to the S3 client
pub const DEFAULT_STORAGE_REGION: &str = "nyc3";

/// Bucket holding the source images
pub const DEFAULT_BUCKET: &str = "catalog-images";

/// Folder prefix every relevant object key starts with
pub const DEFAULT_FOLDER_PREFIX: &str = "products/";

/// Local directory processed images are written below
pub const DEFAULT_OUTPUT_ROOT: &str = "output/products";

/// Background removal endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Header carrying the removal API key
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Total attempts made against a rate-limited removal API
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Pause between consecutive items
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(3);

pub const ENV_STORAGE_ACCESS_KEY: &str = "STORAGE_ACCESS_KEY_ID";
pub const ENV_STORAGE_SECRET_KEY: &str = "STORAGE_SECRET_ACCESS_KEY";
pub const ENV_API_KEY: &str = "REMOVE_BG_API_KEY";

/// Secrets needed to talk to object storage and the removal API
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub storage_access_key: String,
    pub storage_secret_key: String,
    pub api_key: Option<String>,
}

impl Credentials {
    /// The removal API key, treating a blank value as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("storage_access_key", &self.storage_access_key)
            .field("storage_secret_key", &"<redacted>")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// S3-compatible endpoint URL
    pub storage_endpoint: String,

    /// Storage region
    pub storage_region: String,

    /// Source bucket name
    pub bucket: String,

    /// Prefix listed in the bucket and stripped from output paths
    pub folder_prefix: String,

    /// Local root the output tree is mirrored into
    pub output_root: PathBuf,

    /// Background removal endpoint URL
    pub api_endpoint: String,

    pub credentials: Credentials,

    /// Total attempts per item when the removal API answers 429
    pub max_retries: u32,

    /// Fixed pause between consecutive items
    pub pacing_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            storage_region: DEFAULT_STORAGE_REGION.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            folder_prefix: DEFAULT_FOLDER_PREFIX.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            credentials: Credentials::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }
}

impl BatchConfig {
    /// Create a new configuration builder seeded with the compiled-in defaults
    #[must_use]
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Load credentials from the process environment
    ///
    /// A `.env` file in the working directory is read first when present;
    /// variables already set in the environment take precedence over it.
    ///
    /// # Errors
    /// - Storage access key or secret key is missing
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup
    ///
    /// # Errors
    /// - Storage access key or secret key is missing
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    BatchError::configuration(format!("environment variable {name} is not set"))
                })
        };

        let credentials = Credentials {
            storage_access_key: required(ENV_STORAGE_ACCESS_KEY)?,
            storage_secret_key: required(ENV_STORAGE_SECRET_KEY)?,
            api_key: lookup(ENV_API_KEY),
        };

        Ok(Self {
            credentials,
            ..Self::default()
        })
    }

    /// Validate the configuration before any work starts
    ///
    /// # Errors
    /// - Removal API key is missing or blank
    /// - Bucket name is blank
    /// - Output root is empty
    /// - `max_retries` is zero
    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_key().is_none() {
            return Err(BatchError::configuration(format!(
                "no removal API key configured (set {ENV_API_KEY})"
            )));
        }

        if self.bucket.trim().is_empty() {
            return Err(BatchError::configuration("bucket name must not be empty"));
        }

        if self.output_root.as_os_str().is_empty() {
            return Err(BatchError::configuration("output root must not be empty"));
        }

        if self.max_retries == 0 {
            return Err(BatchError::configuration(
                "max_retries must allow at least one attempt",
            ));
        }

        Ok(())
    }
}

/// Builder for `BatchConfig`
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    #[must_use]
    pub fn storage_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.storage_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn storage_region<S: Into<String>>(mut self, region: S) -> Self {
        self.config.storage_region = region.into();
        self
    }

    #[must_use]
    pub fn bucket<S: Into<String>>(mut self, bucket: S) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    #[must_use]
    pub fn folder_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.folder_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn output_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.output_root = root.into();
        self
    }

    #[must_use]
    pub fn api_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.api_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Set only the removal API key, keeping any storage credentials
    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.config.credentials.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config.pacing_delay = delay;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Any failure reported by [`BatchConfig::validate`]
    pub fn build(self) -> Result<BatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_compiled_constants() {
        let config = BatchConfig::default();
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.folder_prefix, DEFAULT_FOLDER_PREFIX);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.pacing_delay, Duration::from_secs(3));
        assert_eq!(config.output_root, PathBuf::from("output/products"));
    }

    #[test]
    fn test_from_env_reads_all_credentials() {
        let vars = env(&[
            (ENV_STORAGE_ACCESS_KEY, "AKIA123"),
            (ENV_STORAGE_SECRET_KEY, "secret"),
            (ENV_API_KEY, "api-key"),
        ]);
        let config = BatchConfig::from_env_with(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.credentials.storage_access_key, "AKIA123");
        assert_eq!(config.credentials.storage_secret_key, "secret");
        assert_eq!(config.credentials.api_key(), Some("api-key"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_requires_storage_credentials() {
        let vars = env(&[(ENV_STORAGE_ACCESS_KEY, "AKIA123"), (ENV_API_KEY, "api-key")]);
        let err = BatchConfig::from_env_with(|name| vars.get(name).cloned()).unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains(ENV_STORAGE_SECRET_KEY));
    }

    #[test]
    fn test_missing_api_key_loads_but_fails_validation() {
        let vars = env(&[
            (ENV_STORAGE_ACCESS_KEY, "AKIA123"),
            (ENV_STORAGE_SECRET_KEY, "secret"),
            (ENV_API_KEY, "   "),
        ]);
        let config = BatchConfig::from_env_with(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.credentials.api_key(), None);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BatchError::Configuration(_)));
    }

    #[test]
    fn test_builder_validation() {
        assert!(BatchConfig::builder().api_key("k").build().is_ok());
        assert!(BatchConfig::builder().build().is_err());
        assert!(BatchConfig::builder().api_key("k").max_retries(0).build().is_err());
        assert!(BatchConfig::builder().api_key("k").bucket(" ").build().is_err());
        assert!(BatchConfig::builder().api_key("k").output_root("").build().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials {
            storage_access_key: "AKIA123".to_string(),
            storage_secret_key: "very-secret".to_string(),
            api_key: Some("api-secret".to_string()),
        };
        let rendered = format!("{credentials:?}");

        assert!(rendered.contains("AKIA123"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("api-secret"));
    }
}
