//! Runtime bridge between the UI command queue and the flag store.
//!
//! The worker owns a tokio runtime on its own thread. Refresh results and store activations
//! travel back as [`UiEvent`]s and are only applied when the UI thread pumps its queue.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use remote_config::{FlagStoreEvent, RemoteFlagStore};
use shared::error::FetchError;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend_bridge::commands::BridgeCommand;
use crate::controller::events::{MountId, UiEvent};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub fn launch(
    flags: Arc<RemoteFlagStore>,
    cmd_rx: Receiver<BridgeCommand>,
    ui_tx: Sender<UiEvent>,
) -> std::io::Result<JoinHandle<()>> {
    // Subscribed before the thread starts so no activation after `launch` is missed.
    let activations = flags.subscribe();
    thread::Builder::new()
        .name("recipe-view-bridge".to_string())
        .spawn(move || run_bridge(flags, activations, cmd_rx, ui_tx))
}

fn run_bridge(
    flags: Arc<RemoteFlagStore>,
    activations: broadcast::Receiver<FlagStoreEvent>,
    cmd_rx: Receiver<BridgeCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("recipe-view-refresh")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("failed to build bridge runtime: {err}");
            reject_refreshes(&cmd_rx, &ui_tx);
            return;
        }
    };

    runtime.spawn(forward_activations(activations, ui_tx.clone()));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BridgeCommand::RefreshFlags { mount } => {
                let flags = Arc::clone(&flags);
                let ui_tx = ui_tx.clone();
                runtime.spawn(async move {
                    let event = match flags.refresh().await {
                        Ok(outcome) => UiEvent::FlagsRefreshed { mount, outcome },
                        Err(error) => UiEvent::FlagsRefreshFailed { mount, error },
                    };
                    forward(&ui_tx, event);
                });
            }
            BridgeCommand::Shutdown => break,
        }
    }

    tracing::debug!("bridge worker stopping");
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

/// Answers every refresh with a failure when no runtime could be built.
fn reject_refreshes(cmd_rx: &Receiver<BridgeCommand>, ui_tx: &Sender<UiEvent>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BridgeCommand::RefreshFlags { mount } => forward(
                ui_tx,
                UiEvent::FlagsRefreshFailed {
                    mount,
                    error: FetchError::Unavailable,
                },
            ),
            BridgeCommand::Shutdown => break,
        }
    }
}

/// Relays every snapshot swap, including ones caused by refreshes of earlier mounts.
async fn forward_activations(
    mut events: broadcast::Receiver<FlagStoreEvent>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        match events.recv().await {
            Ok(FlagStoreEvent::Activated { generation }) => {
                forward(&ui_tx, UiEvent::FlagsActivated { generation });
            }
            Ok(FlagStoreEvent::FetchFailed(_)) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(
                    skipped,
                    "activation events lagged; next one carries the latest generation"
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn forward(ui_tx: &Sender<UiEvent>, event: UiEvent) {
    let mount = event.mount().map(|MountId(id)| id);
    if ui_tx.try_send(event).is_err() {
        // The screen catches up on its next re-render, which reads the latest snapshot.
        tracing::warn!(?mount, "ui event queue unavailable; event dropped");
    }
}
