//! Commands queued from the UI thread to the bridge worker.

use crate::controller::events::MountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    RefreshFlags { mount: MountId },
    Shutdown,
}
