// Port for fetching readings from the energy monitor
use crate::domain::reading::ReadingSet;
use async_trait::async_trait;
use thiserror::Error;

/// A failed poll. Partial data is never surfaced; any of these means the
/// whole attempt is discarded and the cached readings stay on screen.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to monitor failed: {0}")]
    Http(String),
    #[error("monitor did not answer within the fetch timeout")]
    Timeout,
    #[error("monitor answered with HTTP status {0}")]
    Status(u16),
    #[error("malformed monitor response: {0}")]
    Malformed(String),
}

/// One deterministic poll attempt against the configured monitor endpoint.
/// Retry policy belongs to the caller, not the implementation.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn fetch(&self) -> Result<ReadingSet, FetchError>;
}
