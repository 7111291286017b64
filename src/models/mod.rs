//! Data models for naverdl.

mod results;

pub use results::{DownloadResult, FetchResult};
