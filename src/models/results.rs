//! Outcome value objects for the extraction and download stages.
//!
//! Both results are built once, at the end of their stage, and never mutated
//! afterwards. Success counts are derived from the URL lists so that
//! `image_urls.len() == successful_*` always holds.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Serialize seconds rounded to two decimal places.
fn round_elapsed<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((secs * 100.0).round() / 100.0)
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    total_images: usize,
    successful_fetches: usize,
    failure_fetches: usize,
    image_urls: Vec<String>,
    errors: Vec<String>,
    #[serde(serialize_with = "round_elapsed")]
    elapsed_time: f64,
}

impl FetchResult {
    /// Result of a run that walked the thumbnails.
    ///
    /// `failure_fetches` is the number of recorded errors; silent skips do not count.
    pub fn completed(
        total_images: usize,
        image_urls: Vec<String>,
        errors: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            total_images,
            successful_fetches: image_urls.len(),
            failure_fetches: errors.len(),
            image_urls,
            errors,
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    /// The browser could not be launched or the page could not be loaded.
    pub fn aborted(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            total_images: 0,
            successful_fetches: 0,
            failure_fetches: 0,
            image_urls: Vec::new(),
            errors: vec![error.into()],
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    /// Thumbnails never became ready; counted as one failure.
    pub fn readiness_failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            total_images: 0,
            successful_fetches: 0,
            failure_fetches: 1,
            image_urls: Vec::new(),
            errors: vec![error.into()],
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    /// The page has no thumbnails. A normal outcome carrying an informational message.
    pub fn empty(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            total_images: 0,
            successful_fetches: 0,
            failure_fetches: 0,
            image_urls: Vec::new(),
            errors: vec![message.into()],
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    pub fn successful_fetches(&self) -> usize {
        self.successful_fetches
    }

    pub fn failure_fetches(&self) -> usize {
        self.failure_fetches
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Elapsed wall-clock time in seconds, unrounded.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Whether at least one image URL was resolved.
    pub fn has_images(&self) -> bool {
        !self.image_urls.is_empty()
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} found, {} resolved, {} failed in {:.2}s",
            self.total_images, self.successful_fetches, self.failure_fetches, self.elapsed_time
        )
    }

    /// Consume the result, keeping only the resolved URLs.
    pub fn into_image_urls(self) -> Vec<String> {
        self.image_urls
    }
}

/// Outcome of one download run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadResult {
    total_images: usize,
    successful_downloads: usize,
    failure_downloads: usize,
    image_urls: Vec<String>,
    errors: Vec<String>,
    #[serde(serialize_with = "round_elapsed")]
    elapsed_time: f64,
}

impl DownloadResult {
    /// `image_urls` and `errors` must already be in original input order.
    pub fn completed(
        total_images: usize,
        image_urls: Vec<String>,
        errors: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            total_images,
            successful_downloads: image_urls.len(),
            failure_downloads: errors.len(),
            image_urls,
            errors,
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    /// Nothing was requested. A normal outcome carrying an informational message.
    pub fn empty(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            total_images: 0,
            successful_downloads: 0,
            failure_downloads: 0,
            image_urls: Vec::new(),
            errors: vec![message.into()],
            elapsed_time: elapsed.as_secs_f64(),
        }
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    pub fn successful_downloads(&self) -> usize {
        self.successful_downloads
    }

    pub fn failure_downloads(&self) -> usize {
        self.failure_downloads
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Whether at least one file was written.
    pub fn has_images(&self) -> bool {
        !self.image_urls.is_empty()
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} requested, {} saved, {} failed in {:.2}s",
            self.total_images,
            self.successful_downloads,
            self.failure_downloads,
            self.elapsed_time
        )
    }
}
