//! Events marshalled from the bridge worker back onto the UI thread.

use remote_config::RefreshOutcome;
use shared::error::FetchError;

/// Identifies one mount of the screen. A new mount gets a new id, so results addressed to an
/// earlier mount can be told apart and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    FlagsRefreshed {
        mount: MountId,
        outcome: RefreshOutcome,
    },
    FlagsRefreshFailed {
        mount: MountId,
        error: FetchError,
    },
    /// The store swapped in a new snapshot, whichever refresh caused it.
    FlagsActivated {
        generation: u64,
    },
    Info(String),
}

impl UiEvent {
    pub fn mount(&self) -> Option<MountId> {
        match self {
            UiEvent::FlagsRefreshed { mount, .. } | UiEvent::FlagsRefreshFailed { mount, .. } => {
                Some(*mount)
            }
            UiEvent::FlagsActivated { .. } | UiEvent::Info(_) => None,
        }
    }
}

/// Status-line text for a failed refresh. The screen keeps rendering with the last snapshot.
pub fn classify_refresh_failure(error: &FetchError) -> String {
    match error {
        FetchError::Unavailable => {
            "Remote config unavailable; showing default step styles.".to_string()
        }
        FetchError::Transport(_) | FetchError::Timeout(_) => {
            format!("Remote config unreachable ({error}); showing last known step styles.")
        }
        FetchError::Status { .. } if error.is_transient() => {
            format!("Remote config busy ({error}); try again later.")
        }
        FetchError::Status { .. } | FetchError::Malformed(_) => {
            format!("Remote config error: {error}")
        }
    }
}
