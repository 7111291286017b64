//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::browser::ChromeLauncher;
use crate::config::Settings;
use crate::models::{DownloadResult, FetchResult};
use crate::services::{DownloadEvent, DownloadService, ImageExtractor};

use super::progress::DownloadProgress;
use super::report::{self, PipelineReport};

/// Output options for `fetch`.
pub struct FetchOptions {
    pub output: PathBuf,
    pub progress: bool,
    pub json: bool,
}

/// Extract image URLs from a post, then download them.
pub async fn cmd_fetch(settings: &Settings, url: &str, options: &FetchOptions) -> anyhow::Result<()> {
    let output_dir = expand_path(&options.output);

    let fetch = extract_with_spinner(settings, url, !options.json).await;
    if !options.json {
        report::print_fetch_summary(&fetch);
    }

    if !fetch.has_images() {
        if options.json {
            report::print_json(&PipelineReport {
                fetch: &fetch,
                download: None,
            })?;
        } else {
            println!(
                "{} No image URLs extracted, skipping download",
                style("!").yellow()
            );
        }
        return Ok(());
    }

    let service = DownloadService::new(settings.download.clone())?;

    if !options.json {
        println!(
            "{} Downloading {} images to {} ({} workers)",
            style("→").cyan(),
            fetch.successful_fetches(),
            output_dir.display(),
            service.config().concurrency
        );
    }

    let download = if options.progress {
        download_with_progress(&service, fetch.image_urls(), &output_dir).await
    } else {
        service.download(fetch.image_urls(), &output_dir).await
    }
    .context("Download aborted")?;

    if options.json {
        report::print_json(&PipelineReport {
            fetch: &fetch,
            download: Some(&download),
        })?;
    } else {
        report::print_download_summary(&download);
        if download.has_images() {
            println!(
                "  {} Files saved to {}",
                style("→").dim(),
                output_dir.display()
            );
        }
    }

    Ok(())
}

/// Extract image URLs from a post without downloading.
pub async fn cmd_extract(settings: &Settings, url: &str, json: bool) -> anyhow::Result<()> {
    let fetch = extract_with_spinner(settings, url, !json).await;

    if json {
        return report::print_json(&fetch);
    }

    report::print_fetch_summary(&fetch);
    report::print_urls(fetch.image_urls());
    Ok(())
}

async fn extract_with_spinner(settings: &Settings, url: &str, show_spinner: bool) -> FetchResult {
    let launcher = ChromeLauncher::new(settings.browser.clone());
    let extractor = ImageExtractor::with_config(launcher, settings.extractor.clone());

    let pb = if show_spinner {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        ProgressBar::hidden()
    };
    pb.set_message(format!("Extracting images from {}...", url));

    let result = extractor.extract(url).await;
    pb.finish_and_clear();
    result
}

async fn download_with_progress(
    service: &DownloadService,
    urls: &[String],
    output_dir: &Path,
) -> anyhow::Result<DownloadResult> {
    // Event channel for progress updates
    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);

    let total = urls.len();
    let event_handler = tokio::spawn(async move {
        let mut progress = DownloadProgress::new(total);
        while let Some(event) = event_rx.recv().await {
            progress.handle(&event);
        }
        progress.finish();
    });

    let result = service
        .download_with_events(urls, output_dir, event_tx)
        .await;

    // Sender is gone once the run returns; wait for the display to drain
    let _ = event_handler.await;

    result
}

/// Expand a leading `~` in a user-supplied path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
