use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{info, warn};

use super::Stager;
use crate::error::{Error, Result};

/// Outcome of a failed download attempt
enum FetchError {
    /// Timeout or dropped connection, worth another attempt
    Retry(reqwest::Error),
    Fatal(Error),
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Fatal(e.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_body() {
            FetchError::Retry(e)
        } else {
            FetchError::Fatal(Error::Stage(e.to_string()))
        }
    }
}

/// Time allowed to establish a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest silence tolerated while waiting for response bytes
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Stager that downloads a remote archive over HTTP(S)
///
/// Interrupted downloads resume with a Range request when the server
/// supports it, and restart from scratch otherwise. There is no overall
/// deadline: a large archive may take as long as it needs while bytes keep
/// arriving.
pub struct HttpStager {
    client: Client,
    url: String,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpStager {
    /// Create a stager for `url`
    pub fn new(url: String) -> Result<Self> {
        Self::with_timeouts(url, CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    fn with_timeouts(url: String, connect: Duration, read: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .build()
            .map_err(|e| Error::Stage(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Local file name for the download, taken from the last URL segment
    fn file_name(&self) -> String {
        let trimmed = self.url.split(['?', '#']).next().unwrap_or_default();
        match trimmed.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "archive.cpio".to_string(),
        }
    }

    /// Fetch bytes from `offset` onwards into `file`, which must be
    /// positioned at `offset`
    ///
    /// Returns the new length of the local file.
    async fn fetch_from(
        &self,
        offset: u64,
        file: &mut fs::File,
    ) -> std::result::Result<u64, FetchError> {
        let mut request = self.client.get(&self.url);
        if offset > 0 {
            request = request.header("Range", format!("bytes={}-", offset));
        }
        let mut resp = request.send().await?;

        let mut written = match resp.status() {
            StatusCode::PARTIAL_CONTENT => offset,
            status if status.is_success() => {
                // Full body: the server ignored the Range header
                file.set_len(0).await?;
                file.seek(SeekFrom::Start(0)).await?;
                0
            }
            status => {
                return Err(FetchError::Fatal(Error::Stage(format!(
                    "HTTP request failed with status: {}",
                    status
                ))));
            }
        };

        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            self.transferred_bytes
                .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }

        Ok(written)
    }
}

#[async_trait]
impl Stager for HttpStager {
    async fn stage(&self, work_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(work_dir).await?;
        let target = work_dir.join(self.file_name());
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&target)
            .await?;

        let mut received = 0u64;
        let mut retry_count = 0;

        loop {
            match self.fetch_from(received, &mut file).await {
                Ok(total) => {
                    received = total;
                    break;
                }
                Err(FetchError::Retry(e)) => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(Error::Stage(format!("max retries exceeded: {e}")));
                    }
                    warn!(
                        url = %self.url,
                        retry = retry_count,
                        max = self.max_retry,
                        "connection error: {}",
                        e
                    );
                    // Resume after whatever actually reached the disk
                    file.flush().await?;
                    received = file.metadata().await?.len();
                    file.seek(SeekFrom::Start(received)).await?;
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(FetchError::Fatal(e)) => return Err(e),
            }
        }

        file.flush().await?;
        info!(
            url = %self.url,
            bytes = received,
            path = %target.display(),
            "staged remote archive"
        );
        Ok(target)
    }

    fn source(&self) -> &str {
        &self.url
    }
}
