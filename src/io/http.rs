use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use anyhow::{Result, anyhow, bail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY: u32 = 10;

/// Non-success HTTP status returned by the remote archive host
#[derive(Debug, thiserror::Error)]
#[error("HTTP request failed with status: {0}")]
pub struct HttpStatusError(pub StatusCode);

impl HttpStatusError {
    pub fn is_not_found(&self) -> bool {
        matches!(self.0, StatusCode::NOT_FOUND | StatusCode::GONE)
    }
}

/// HTTP Range reader for livery archives hosted remotely
///
/// Only the byte ranges the installer asks for are downloaded: the archive
/// tail, the central directory and the entries being extracted.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Check the URL with a HEAD request
    ///
    /// The server must report `Accept-Ranges: bytes` and a `Content-Length`.
    /// A non-success status is returned as [`HttpStatusError`] so callers can
    /// tell a missing archive from other failures.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let resp = client.head(&url).send().await?;
        if !resp.status().is_success() {
            return Err(HttpStatusError(resp.status()).into());
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            bail!("Remote server does not support Range requests");
        }

        // Read the header directly, HEAD responses carry no body to size
        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        debug!(url = %url, size, "Remote archive supports Range requests");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected {
            let range = format!("bytes={}-{}", offset + received as u64, end);

            match self.client.get(&self.url).header("Range", &range).send().await {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(HttpStatusError(resp.status()).into());
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        bail!("Remote server returned an empty body for {}", range);
                    }

                    let chunk_len = bytes.len().min(expected - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= MAX_RETRY {
                        bail!("Max retries exceeded for {}", self.url);
                    }
                    warn!(
                        url = %self.url,
                        retry = retry_count,
                        max = MAX_RETRY,
                        error = %e,
                        "Connection error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(retry_count))).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn transferred_bytes(&self) -> Option<u64> {
        Some(self.transferred_bytes.load(Ordering::Relaxed))
    }
}
