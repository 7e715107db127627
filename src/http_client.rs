//! HTTP Client Module
//!
//! The feed core only sees the `UrlFetcher` capability. The reqwest-backed
//! implementation adds:
//! - Semaphore-based concurrency limiting
//! - Opt-in retries with exponential backoff and jitter (off by default)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{BubblaError, Result};

/// Fetches the raw bytes behind a URL
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Retries after the first attempt; 0 surfaces the first failure
    pub max_retries: u32,
    /// Initial retry delay
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 0,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            user_agent: format!("Bubbla/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            max_retries: config.max_retries,
            ..Default::default()
        }
    }
}

/// reqwest-backed `UrlFetcher`
pub struct HttpUrlFetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
    config: HttpClientConfig,
}

impl HttpUrlFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));

        Ok(Self {
            client,
            semaphore,
            config,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Gets the number of available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::BAD_GATEWAY
                | StatusCode::REQUEST_TIMEOUT
        )
    }

    async fn backoff(&self, delay: &mut Duration) {
        // Jitter: random factor between 0.5 and 1.5
        let jitter = 0.5 + rand::random::<f64>();
        tokio::time::sleep(Duration::from_secs_f64(delay.as_secs_f64() * jitter)).await;
        *delay = std::cmp::min(*delay * 2, self.config.max_retry_delay);
    }
}

#[async_trait]
impl UrlFetcher for HttpUrlFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| BubblaError::ConnectionLost("Semaphore closed".to_string()))?;

        debug!(url = %url, "Executing HTTP request");

        let mut attempt = 0u32;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempt += 1;
            let can_retry = attempt <= self.config.max_retries;

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.bytes().await?;
                        debug!(status = %status, attempt, bytes = body.len(), "Request succeeded");
                        return Ok(body.to_vec());
                    }
                    if Self::is_retryable_status(status) && can_retry {
                        warn!(status = %status, attempt, "Retryable status, will retry");
                        self.backoff(&mut delay).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(BubblaError::ApiError {
                        code: status.to_string(),
                        message: body,
                    });
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && can_retry {
                        warn!(error = %e, attempt, "Transient error, will retry");
                        self.backoff(&mut delay).await;
                        continue;
                    }
                    return Err(BubblaError::HttpError(e));
                }
            }
        }
    }
}
