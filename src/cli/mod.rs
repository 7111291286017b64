//! Command-line interface.
//!
//! Parses arguments and dispatches to the command implementations.

mod commands;
mod progress;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "naverdl")]
#[command(about = "Download original-resolution images from Naver Blog posts")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Browser options shared by commands that drive a page.
#[derive(clap::Args, Debug, Clone)]
struct BrowserArgs {
    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Connect to a running Chrome DevTools endpoint instead of launching one
    #[arg(long, env = "BROWSER_URL")]
    browser_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract image URLs from a post and download them (extract + download combined)
    Fetch {
        /// Blog post URL
        url: String,
        /// Output directory
        #[arg(short, long, default_value = "images")]
        output: PathBuf,
        /// Number of download workers (default: 5)
        #[arg(short, long, env = "NAVERDL_CONCURRENCY")]
        workers: Option<usize>,
        /// Extra attempts for transient download failures (default: 0)
        #[arg(long, env = "NAVERDL_RETRIES")]
        retries: Option<u32>,
        /// Detect the image type from content when the URL has no extension
        #[arg(long)]
        sniff: bool,
        /// Show progress for each file
        #[arg(short = 'P', long)]
        progress: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Extract image URLs from a post without downloading
    Extract {
        /// Blog post URL
        url: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        browser: BrowserArgs,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env();

    match cli.command {
        Commands::Fetch {
            url,
            output,
            workers,
            retries,
            sniff,
            progress,
            json,
            browser,
        } => {
            browser.apply(&mut settings);
            if let Some(workers) = workers.filter(|w| *w > 0) {
                settings.download.concurrency = workers;
            }
            if let Some(retries) = retries {
                settings.download.retry.max_retries = retries;
            }
            settings.download.sniff_extension |= sniff;

            let options = commands::FetchOptions {
                output,
                progress: progress && !json,
                json,
            };
            commands::cmd_fetch(&settings, &url, &options).await
        }
        Commands::Extract { url, json, browser } => {
            browser.apply(&mut settings);
            commands::cmd_extract(&settings, &url, json).await
        }
    }
}

impl BrowserArgs {
    fn apply(&self, settings: &mut Settings) {
        if self.headed {
            settings.browser.headless = false;
        }
        if let Some(url) = self.browser_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                settings.browser.remote_url = Some(url.to_string());
            }
        }
    }
}
