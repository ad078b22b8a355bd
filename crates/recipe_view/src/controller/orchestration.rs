//! Command orchestration helpers from UI actions to the bridge command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BridgeCommand;

pub fn dispatch_bridge_command(
    cmd_tx: &Sender<BridgeCommand>,
    cmd: BridgeCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BridgeCommand::RefreshFlags { .. } => "refresh_flags",
        BridgeCommand::Shutdown => "shutdown",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->bridge command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; flag refresh skipped".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Flag refresh worker disconnected; showing last known step styles".to_string();
        }
    }
}
