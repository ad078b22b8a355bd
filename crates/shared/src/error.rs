use std::time::Duration;

use thiserror::Error;

/// Failure of one remote-config fetch-and-activate cycle.
///
/// Cloneable so a failure can be handed across the worker/UI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("remote config transport failure: {0}")]
    Transport(String),
    #[error("remote config backend answered with HTTP {status}")]
    Status { status: u16 },
    #[error("malformed remote config payload: {0}")]
    Malformed(String),
    #[error("remote config fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote config backend is unavailable")]
    Unavailable,
}

impl FetchError {
    /// Whether a later attempt has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Status { status } => *status == 429 || *status >= 500,
            FetchError::Malformed(_) | FetchError::Unavailable => false,
        }
    }
}
