// Port for pushing rendered frames to the physical display
use crate::infrastructure::renderer::Frame;
use async_trait::async_trait;
use thiserror::Error;

/// E-paper refresh mode. Full refresh clears ghosting but flashes the panel;
/// partial refresh is quick and quiet. The agent picks full only when the
/// rotation returns to the overview, and for the very first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Full,
    Partial,
}

#[derive(Debug, Error)]
pub enum DisplayPushError {
    #[error("failed to spool frame: {0}")]
    Spool(#[source] std::io::Error),
    #[error("failed to run display command: {0}")]
    Command(#[source] std::io::Error),
    #[error("display command exited with {0}")]
    Exit(String),
}

/// The external display-push capability. Implementations own the transport
/// to the panel; the agent only hands over pixels and a refresh mode.
#[async_trait]
pub trait DisplayPort: Send + Sync {
    async fn push(&self, frame: &Frame, mode: RefreshMode) -> Result<(), DisplayPushError>;
}
