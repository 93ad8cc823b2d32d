//! HTTP fetcher for downloading delegation feeds.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 2000;

/// Maximum feed size (64 MB)
/// The largest "latest" file (ripencc) is around 20 MB, so 64 MB leaves ample margin
const MAX_FEED_SIZE: usize = 64 * 1024 * 1024;

/// HTTP client for fetching delegation feeds
pub struct Fetcher {
    client: Client,
    max_size: usize,
}

impl Fetcher {
    /// Create a new fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("rirset/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            max_size: MAX_FEED_SIZE,
        })
    }

    /// Override the download size limit
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Fetch a feed and split it into lines
    pub async fn fetch_lines(&self, url: &str) -> Result<Vec<String>> {
        info!("Fetching {}...", url);

        let body = self
            .fetch_with_retry(url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let lines = split_lines(&body);
        info!("Fetched {} lines ({} bytes)", lines.len(), body.len());
        Ok(lines)
    }

    /// Fetch content with retry logic and size validation
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = RETRY_DELAY_MS * (1 << (attempt - 1));
                debug!("Retry {} after {}ms for {}", attempt, delay, url);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        if let Some(content_length) = response.content_length() {
                            if exceeds_limit(content_length, self.max_size) {
                                return Err(anyhow::anyhow!(
                                    "Response too large: {} bytes (max: {} bytes)",
                                    content_length,
                                    self.max_size
                                ));
                            }
                        }

                        let body = response
                            .text()
                            .await
                            .context("Failed to read response body")?;

                        // Content-Length may be absent or wrong
                        if body.len() > self.max_size {
                            return Err(anyhow::anyhow!(
                                "Downloaded content too large: {} bytes (max: {} bytes)",
                                body.len(),
                                self.max_size
                            ));
                        }

                        return Ok(body);
                    }

                    // Client errors will not improve on retry
                    if status.is_client_error() {
                        return Err(anyhow::anyhow!("HTTP {}", status));
                    }
                    last_error = Some(anyhow::anyhow!("HTTP {}", status));
                }
                Err(e) => {
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }
}

/// Whether a declared `Content-Length` is above `max_size`, without
/// truncating the length on 32-bit targets
fn exceeds_limit(content_length: u64, max_size: usize) -> bool {
    usize::try_from(content_length).map_or(true, |len| len > max_size)
}

/// Read a previously downloaded feed from disk
pub fn read_local_lines(path: &Path) -> Result<Vec<String>> {
    info!("Reading {:?}...", path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file: {:?}", path))?;
    Ok(split_lines(&content))
}

/// Split a feed body into lines, accepting `\n` and `\r\n` endings
pub fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(String::from).collect()
}
