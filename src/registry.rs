//! HTTP client for the channel registry.
//!
//! Retries and rate limiting live here, outside the engine: the resolver only
//! ever sees a fully fetched, validated snapshot.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tracing::{info, warn};

use crate::model::ChannelSnapshot;

pub struct RegistryClient {
    url: String,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
}

impl RegistryClient {
    pub fn new(url: impl Into<String>, requests_per_minute: u32, max_retries: u32) -> Result<Self> {
        // HTTP client with timeouts
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to create HTTP client")?;

        let per_minute = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| anyhow!("registry rate limit must be at least 1 request per minute"))?;

        Ok(Self {
            url: url.into(),
            http_client,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            max_retries: max_retries.max(1),
        })
    }

    /// Fetch the registry, retrying with exponential backoff. A response that
    /// arrives but fails validation is not retried.
    pub async fn fetch(&self) -> Result<ChannelSnapshot> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(FetchError::Invalid(e)) => return Err(e),
                Err(FetchError::Transient(e)) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(e.context(format!(
                            "Failed to fetch channel registry after {} attempts",
                            self.max_retries
                        )));
                    }
                    warn!(
                        "Registry fetch attempt {} failed: {:#}. Retrying...",
                        attempt, e
                    );
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<ChannelSnapshot, FetchError> {
        // Wait for rate limit
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to fetch channel registry")
            .map_err(FetchError::Transient)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read registry response body")
            .map_err(FetchError::Transient)?;

        if !status.is_success() {
            let err = anyhow!("Registry error (status {}): {}", status, truncate(&body, 200));
            // 4xx will not fix itself on retry
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                FetchError::Transient(err)
            } else {
                FetchError::Invalid(err)
            });
        }

        let snapshot = ChannelSnapshot::from_json(&body)
            .context("Channel registry response failed validation")
            .map_err(FetchError::Invalid)?;

        if snapshot.total_channels != snapshot.channels.len() {
            warn!(
                "Registry reports {} channels but sent {}",
                snapshot.total_channels,
                snapshot.channels.len()
            );
        }
        info!("Fetched {} channels from registry", snapshot.channels.len());
        Ok(snapshot)
    }
}

enum FetchError {
    Transient(anyhow::Error),
    Invalid(anyhow::Error),
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
