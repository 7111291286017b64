//! Service layer for the extraction and download pipeline.
//!
//! This module contains domain logic separated from UI concerns.
//! The CLI drives both services and renders their events and results.

pub mod download;
pub mod extract;

pub use download::{DownloadConfig, DownloadEvent, DownloadService};
pub use extract::{ExtractorConfig, ImageExtractor, PlatformSelectors};
