//! Human-readable and JSON rendering of stage results.

use console::style;
use serde::Serialize;

use crate::models::{DownloadResult, FetchResult};

/// Both stage results of a `fetch` run, for `--json`.
#[derive(Serialize)]
pub struct PipelineReport<'a> {
    pub fetch: &'a FetchResult,
    pub download: Option<&'a DownloadResult>,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_fetch_summary(result: &FetchResult) {
    let marker = if result.has_images() {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!("{} Extraction: {}", marker, result.summary());
    print_errors(result.errors());
}

pub fn print_download_summary(result: &DownloadResult) {
    let marker = if result.failure_downloads() == 0 {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!("{} Download: {}", marker, result.summary());
    print_errors(result.errors());
}

pub fn print_urls(urls: &[String]) {
    for (idx, url) in urls.iter().enumerate() {
        println!("  {} {}", style(format!("{:03}", idx + 1)).dim(), url);
    }
}

fn print_errors(errors: &[String]) {
    for error in errors {
        println!("  {} {}", style("✗").red(), error);
    }
}
