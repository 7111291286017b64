//! naverdl - Naver Blog original-resolution image downloader.
//!
//! Two stages run in sequence: [`services::extract`] drives a browser through
//! each thumbnail's preview popup to collect ordered original image URLs, and
//! [`services::download`] fetches them concurrently into numbered files.

pub mod browser;
pub mod cli;
pub mod config;
pub mod http_client;
pub mod models;
pub mod services;

pub use models::{DownloadResult, FetchResult};
