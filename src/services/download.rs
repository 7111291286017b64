//! Ordered image download service.
//!
//! Fetches every URL concurrently through a bounded worker pool, writes each
//! to a numbered file and reports outcomes in the original input order.
//! Separated from UI concerns: progress is emitted as events.

pub mod naming;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use crate::http_client::{HttpClient, RetryConfig};
use crate::models::DownloadResult;

/// Informational entry for an empty input list.
pub const NOTHING_TO_DOWNLOAD: &str = "nothing to download";

/// Events emitted during download operations.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// A worker picked up the image at `index`.
    Started { index: usize, url: String },
    /// File written.
    Completed {
        index: usize,
        url: String,
        path: PathBuf,
        bytes: u64,
    },
    /// Fetch or write failed.
    Failed {
        index: usize,
        url: String,
        error: String,
    },
}

/// Configuration for the download service.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum in-flight fetches.
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    /// Detect the image type from content when the URL has no usable extension.
    pub sniff_extension: bool,
    /// `None`, `"browser"`, `"impersonate"`, or a literal user agent string.
    pub user_agent: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            sniff_extension: false,
            user_agent: None,
        }
    }
}

/// Per-task outcome, tagged with the original index.
struct TaskOutcome {
    index: usize,
    error: Option<String>,
}

/// Service for downloading an ordered list of image URLs.
pub struct DownloadService {
    client: HttpClient,
    config: DownloadConfig,
}

impl DownloadService {
    /// Create a new download service with its own HTTP client.
    pub fn new(config: DownloadConfig) -> anyhow::Result<Self> {
        let client = HttpClient::with_user_agent(config.request_timeout, config.user_agent.as_deref())
            .context("Failed to build HTTP client")?
            .with_retry(config.retry.clone());

        Ok(Self::with_client(client, config))
    }

    /// Create a download service around an existing client.
    pub fn with_client(client: HttpClient, config: DownloadConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `urls` into `output_dir` as `001.ext`, `002.ext`, ...
    ///
    /// The only error is failing to create `output_dir`; every per-image
    /// failure is recorded in the result.
    pub async fn download(&self, urls: &[String], output_dir: &Path) -> anyhow::Result<DownloadResult> {
        self.run(urls, output_dir, None).await
    }

    /// Same as [`download`](Self::download), emitting progress events on `event_tx`.
    pub async fn download_with_events(
        &self,
        urls: &[String],
        output_dir: &Path,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> anyhow::Result<DownloadResult> {
        self.run(urls, output_dir, Some(event_tx)).await
    }

    async fn run(
        &self,
        urls: &[String],
        output_dir: &Path,
        event_tx: Option<mpsc::Sender<DownloadEvent>>,
    ) -> anyhow::Result<DownloadResult> {
        let started = Instant::now();

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
        debug!("Output directory: {}", output_dir.display());

        if urls.is_empty() {
            return Ok(DownloadResult::empty(NOTHING_TO_DOWNLOAD, started.elapsed()));
        }

        info!(
            "Downloading {} images with {} workers",
            urls.len(),
            self.config.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = FuturesUnordered::new();

        for (index, url) in urls.iter().enumerate() {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let url = url.clone();
            let output_dir = output_dir.to_path_buf();
            let sniff = self.config.sniff_extension;
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(e.to_string()),
                };

                if let Some(tx) = &event_tx {
                    let _ = tx
                        .send(DownloadEvent::Started {
                            index,
                            url: url.clone(),
                        })
                        .await;
                }

                let saved = fetch_and_save(&client, index, &url, &output_dir, sniff).await;

                if let Some(tx) = &event_tx {
                    let event = match &saved {
                        Ok((path, bytes)) => DownloadEvent::Completed {
                            index,
                            url: url.clone(),
                            path: path.clone(),
                            bytes: *bytes,
                        },
                        Err(error) => DownloadEvent::Failed {
                            index,
                            url: url.clone(),
                            error: error.clone(),
                        },
                    };
                    let _ = tx.send(event).await;
                }

                saved.map(|_| ())
            });

            tasks.push(async move {
                let error = match handle.await {
                    Ok(Ok(())) => None,
                    Ok(Err(error)) => Some(error),
                    Err(e) => Some(format!("download task failed: {}", e)),
                };
                TaskOutcome { index, error }
            });
        }

        // Completion order is arbitrary; slots restore input order
        let mut slots: Vec<Option<Option<String>>> = vec![None; urls.len()];
        while let Some(outcome) = tasks.next().await {
            slots[outcome.index] = Some(outcome.error);
        }

        let mut image_urls = Vec::new();
        let mut errors = Vec::new();
        for (index, (url, slot)) in urls.iter().zip(slots).enumerate() {
            match slot {
                Some(None) => image_urls.push(url.clone()),
                Some(Some(error)) => errors.push(format_error(index, &error)),
                None => errors.push(format_error(index, "task did not report")),
            }
        }

        info!(
            "Downloaded {}/{} images ({} failed)",
            image_urls.len(),
            urls.len(),
            errors.len()
        );

        Ok(DownloadResult::completed(
            urls.len(),
            image_urls,
            errors,
            started.elapsed(),
        ))
    }
}

fn format_error(index: usize, error: &str) -> String {
    format!("image {}: download failed: {}", index + 1, error)
}

/// Fetch one URL and write it to its numbered file.
async fn fetch_and_save(
    client: &HttpClient,
    index: usize,
    url: &str,
    output_dir: &Path,
    sniff: bool,
) -> Result<(PathBuf, u64), String> {
    debug!("Downloading image {} from {}", index + 1, url);

    let content = client.get_bytes(url).await.map_err(|e| e.to_string())?;

    let ext = naming::resolve_extension(url, &content, sniff);
    let path = output_dir.join(naming::image_filename(index, ext));

    tokio::fs::write(&path, &content)
        .await
        .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;

    debug!("Saved image {} to {}", index + 1, path.display());
    Ok((path, content.len() as u64))
}
