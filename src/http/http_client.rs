use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::{Method, StatusCode};
use reqwest_retry::{Jitter, RetryTransientMiddleware, Retryable, RetryableStrategy, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use super::error::HttpError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BACKOFF_SECS: u64 = 60;
const DEFAULT_MAX_BACKOFF_SECS: u64 = 600;
const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Timeout and rate-limit back-off settings for [`HttpClient`].
///
/// The first retry after a 429 waits `backoff`; every following wait doubles,
/// capped at `max_backoff`. After `max_retries` retries the call fails with
/// [`HttpError::RateLimited`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub timeout: Duration,
    pub backoff: Duration,
    pub max_backoff: Duration,
    pub max_retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            max_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }
}

/// Only `429 Too Many Requests` is worth retrying. Transport errors and every
/// other status are handed straight back to the caller.
struct RateLimitStrategy;

impl RetryableStrategy for RateLimitStrategy {
    fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                warn!(url:% = response.url(); "HTTP: Rate limited, backing off");
                Some(Retryable::Transient)
            },
            Ok(response) if response.status().is_success() => None,
            Ok(_) | Err(_) => Some(Retryable::Fatal),
        }
    }
}

pub(crate) struct HttpClient {
    base_url: Url,
    client: reqwest_middleware::ClientWithMiddleware,
    api_key: Option<String>,
    max_retries: u32,
    last_latency: RwLock<Option<(Duration, Instant)>>,
}

impl HttpClient {
    pub fn new(base_url: Url) -> Result<Self, anyhow::Error> {
        Self::with_config(base_url, None, RetrySettings::default())
    }

    pub fn with_config(base_url: Url, api_key: Option<String>, settings: RetrySettings) -> Result<Self, anyhow::Error> {
        let max_backoff = settings.max_backoff.max(settings.backoff);
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(settings.backoff, max_backoff)
            .jitter(Jitter::None)
            .build_with_max_retries(settings.max_retries);

        let inner_client = reqwest::Client::builder().timeout(settings.timeout).build()?;

        let client = reqwest_middleware::ClientBuilder::new(inner_client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                RateLimitStrategy,
            ))
            .build();

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            client,
            api_key,
            max_retries: settings.max_retries,
            last_latency: RwLock::new(None),
        })
    }

    /// Sends a request to `path` (relative to the base URL) and decodes the
    /// JSON response.
    pub async fn send_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, HttpError> {
        let start = Instant::now();
        let url = self.base_url.join(path.trim_start_matches('/'))?;

        let mut req = match method {
            Method::GET => self.client.get(url),
            Method::POST => {
                let req = self.client.post(url);
                if let Some(body) = body {
                    req.body(serde_json::to_string(&body)?)
                        .header("Content-Type", "application/json")
                } else {
                    req
                }
            },
            _ => return Err(HttpError::UnsupportedMethod),
        };

        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key.as_str());
        }

        let resp = req.send().await.map_err(|e| match e {
            reqwest_middleware::Error::Reqwest(e) => HttpError::RequestFailed(e),
            other => HttpError::MiddlewareError(other),
        })?;
        let latency = start.elapsed();
        self.update_latency(latency).await;
        debug!(path = path, latency_ms = latency.as_millis() as u64; "HTTP: Request completed");

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HttpError::RateLimited {
                attempts: self.max_retries + 1,
            });
        }
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".into());
            return Err(HttpError::ServerError { status, body });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn update_latency(&self, duration: Duration) {
        *self.last_latency.write().await = Some((duration, Instant::now()));
    }

    pub async fn get_latency(&self) -> Option<Duration> {
        self.last_latency.read().await.map(|(d, _)| d)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
