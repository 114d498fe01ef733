//! Object storage access
//!
//! The batch only needs two operations from storage: list the keys under a
//! prefix and fetch the bytes of one key. Both are bound to a single bucket
//! chosen when the gateway is constructed.

pub mod s3;

use crate::error::Result;
use async_trait::async_trait;

pub use self::s3::S3Gateway;

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// All object keys under `prefix`, in the order storage returns them
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Full body of the object stored at `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}
