//! Browser driver errors.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors raised by a [`super::BrowserSession`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Target page, context or browser has been closed: {0}")]
    Closed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Protocol(String),
}

impl DriverError {
    /// Classify a raw driver message, recognizing closed-session failures.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("closed") {
            Self::Closed(message)
        } else {
            Self::Protocol(message)
        }
    }

    /// True when the page or session is gone and cannot serve further calls.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Closed(_) => true,
            other => other.to_string().to_lowercase().contains("closed"),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Run `step` to completion within `budget`, mapping overrun to [`DriverError::Timeout`].
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) async fn within_budget<T, F, M>(budget: Duration, step: F, describe: M) -> DriverResult<T>
where
    F: Future<Output = DriverResult<T>>,
    M: FnOnce() -> String,
{
    match tokio::time::timeout(budget, step).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout(describe())),
    }
}

#[cfg(feature = "browser")]
impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::from_message(err.to_string())
    }
}
