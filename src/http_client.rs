use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::error::ValidationError;
use crate::schema_fetcher::SchemaSource;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds, `0` waits indefinitely
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("ipxact-validate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// Async HTTP client for downloading remote schemas
pub struct AsyncHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ValidationError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30));
        if let Some(request_timeout) = config.request_timeout() {
            builder = builder.timeout(request_timeout);
        }
        let client = builder.build().map_err(ValidationError::from)?;

        Ok(Self { client, config })
    }

    /// Download a schema body, reporting `(downloaded, total)` after every chunk
    pub async fn download_schema_with_progress<F>(
        &self,
        url: &str,
        mut progress_callback: F,
    ) -> Result<Vec<u8>, ValidationError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        let response = self.get_response_with_retry(url).await?;

        let total_size = response.content_length();
        let mut downloaded = 0u64;
        let mut buffer = Vec::new();

        progress_callback(0, total_size);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = TryStreamExt::try_next(&mut stream)
            .await
            .map_err(ValidationError::from)?
        {
            buffer.extend_from_slice(&chunk);
            downloaded += chunk.len() as u64;
            progress_callback(downloaded, total_size);
        }

        Ok(buffer)
    }

    async fn get_response_with_retry(&self, url: &str) -> Result<Response, ValidationError> {
        let mut current_attempt = 0;

        loop {
            match self.make_request(url).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error = ValidationError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    };

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && current_attempt < self.config.retry_attempts {
                        tracing::debug!(url, status = status.as_u16(), "retrying schema download");
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }

                    return Err(error);
                }
                Err(error) => {
                    if current_attempt < self.config.retry_attempts
                        && self.is_retryable_error(&error)
                    {
                        tracing::debug!(url, %error, "retrying schema download");
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn make_request(&self, url: &str) -> Result<Response, ValidationError> {
        let request_future = self.client.get(url).send();

        match self.config.request_timeout() {
            Some(limit) => timeout(limit, request_future)
                .await
                .map_err(|_| ValidationError::Timeout {
                    url: url.to_string(),
                    timeout_seconds: self.config.timeout_seconds,
                })?
                .map_err(ValidationError::from),
            None => request_future.await.map_err(ValidationError::from),
        }
    }

    /// Wait before retry with exponential backoff
    async fn wait_before_retry(&self, attempt: u32) {
        sleep(self.retry_delay(attempt)).await;
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }

    fn is_retryable_error(&self, error: &ValidationError) -> bool {
        match error {
            ValidationError::Http(reqwest_error) => {
                reqwest_error.is_timeout() || reqwest_error.is_connect()
            }
            ValidationError::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[async_trait]
impl SchemaSource for AsyncHttpClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ValidationError> {
        self.download_schema_with_progress(url, |downloaded, total| {
            tracing::trace!(url, downloaded, total, "schema download progress");
        })
        .await
    }
}
