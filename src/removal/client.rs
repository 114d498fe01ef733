//! HTTP client for the background removal API

use crate::config::{BatchConfig, API_KEY_HEADER};
use crate::error::{BatchError, Result};
use crate::removal::backoff::{with_rate_limit_retry, Attempt};
use crate::removal::BackgroundRemover;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Output size requested from the API
const OUTPUT_SIZE: &str = "auto";

/// Content type sent for every upload; the API detects the real format itself
const UPLOAD_CONTENT_TYPE: &str = "image/png";

/// Removal API client with bounded retry on HTTP 429
#[derive(Debug, Clone)]
pub struct RemovalClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    title: Option<String>,
    detail: Option<String>,
}

impl RemovalClient {
    /// Create a client for the endpoint, key and retry budget in `config`
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &BatchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BatchError::network_error("Failed to create HTTP client", e))?;

        Ok(Self::with_client(
            client,
            config.api_endpoint.clone(),
            config.credentials.api_key().map(str::to_owned),
            config.max_retries,
        ))
    }

    pub fn with_client(
        client: Client,
        endpoint: String,
        api_key: Option<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Multipart body for one attempt; bodies are consumed on send
    fn build_form(image: &[u8], display_name: &str) -> Result<Form> {
        let part = Part::bytes(image.to_vec())
            .file_name(display_name.to_owned())
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(|e| BatchError::network_error("Failed to build upload part", e))?;

        Ok(Form::new()
            .text("size", OUTPUT_SIZE)
            .part("image_file", part))
    }

    async fn send_once(
        &self,
        api_key: &str,
        image: &[u8],
        display_name: &str,
        attempt: u32,
    ) -> Result<Attempt<Vec<u8>>> {
        let form = Self::build_form(image, display_name)?;

        debug!(
            name = %display_name,
            attempt = attempt + 1,
            bytes = image.len(),
            "Submitting image to removal API"
        );

        let response = self
            .client
            .post(self.endpoint.as_str())
            .header(API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BatchError::network_error(format!("Failed to reach {}", self.endpoint), e))?;

        let status = response.status();

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| BatchError::network_error("Failed to read removal result", e))?;
            return Ok(Attempt::Done(bytes.to_vec()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), error = %e, "Failed to read removal error body");
                String::new()
            },
        };
        Err(BatchError::Api {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: describe_error_body(&body),
            body,
        })
    }
}

/// First `title: detail` of a JSON error body, or the body itself
fn describe_error_body(body: &str) -> String {
    let entry = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next());

    match entry {
        Some(ApiErrorEntry {
            title: Some(title),
            detail: Some(detail),
        }) => format!("{title}: {detail}"),
        Some(ApiErrorEntry {
            title: Some(title),
            detail: None,
        }) => title,
        Some(ApiErrorEntry {
            title: None,
            detail: Some(detail),
        }) => detail,
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl BackgroundRemover for RemovalClient {
    async fn submit(&self, image: &[u8], display_name: &str) -> Result<Vec<u8>> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BatchError::configuration("no removal API key configured"))?;

        with_rate_limit_retry(self.max_retries, move |attempt| {
            self.send_once(api_key, image, display_name, attempt)
        })
        .await
    }
}
