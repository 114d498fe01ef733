//! Remote background removal
//!
//! [`RemovalClient`] submits one image to the removal API and retries only
//! when the API reports rate limiting. The retry arithmetic lives in
//! [`backoff`] so it can be exercised without a network.

pub mod backoff;
pub mod client;

use crate::error::Result;
use async_trait::async_trait;

pub use self::backoff::{backoff_delay, jittered_delay, with_rate_limit_retry, Attempt};
pub use self::client::RemovalClient;

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background of `image`, returning the processed PNG bytes
    ///
    /// `display_name` is sent as the file name of the uploaded part.
    async fn submit(&self, image: &[u8], display_name: &str) -> Result<Vec<u8>>;
}
