//! Lifecycle of one recipe screen on the UI thread.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use remote_config::RemoteFlagStore;
use shared::domain::{Recipe, Section};

use crate::{
    backend_bridge::commands::BridgeCommand,
    controller::{
        events::{classify_refresh_failure, MountId, UiEvent},
        orchestration::dispatch_bridge_command,
    },
    navigation::Router,
    render::{render, RenderTree},
    selector::SectionSelector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unmounted,
    Mounted(MountId),
    Dismissed,
}

/// What applying one [`UiEvent`] did to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    Rerendered,
    /// The refresh for the current mount finished without changing the snapshot.
    RefreshSettled,
    StatusUpdated,
    /// The screen already shows the activated snapshot.
    UpToDate,
    /// Addressed to a dismissed or replaced mount, or to a screen that is not mounted.
    Discarded,
}

pub struct ScreenController<R: Router> {
    recipe: Arc<Recipe>,
    flags: Arc<RemoteFlagStore>,
    selector: SectionSelector,
    router: R,
    cmd_tx: Sender<BridgeCommand>,
    ui_rx: Receiver<UiEvent>,
    lifecycle: Lifecycle,
    mounts: u64,
    tree: Option<RenderTree>,
    rendered_generation: u64,
    renders: usize,
    status: String,
}

impl<R: Router> ScreenController<R> {
    pub fn new(
        recipe: Arc<Recipe>,
        flags: Arc<RemoteFlagStore>,
        router: R,
        cmd_tx: Sender<BridgeCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        Self {
            recipe,
            flags,
            selector: SectionSelector::new(),
            router,
            cmd_tx,
            ui_rx,
            lifecycle: Lifecycle::Unmounted,
            mounts: 0,
            tree: None,
            rendered_generation: 0,
            renders: 0,
            status: String::new(),
        }
    }

    /// Renders with the current snapshot and queues one flag refresh for this mount.
    ///
    /// Calling it again while mounted re-renders but does not queue another refresh.
    pub fn on_mount(&mut self) -> &RenderTree {
        match self.lifecycle {
            Lifecycle::Mounted(mount) => {
                tracing::debug!(mount = mount.0, "screen already mounted; refresh not re-queued");
            }
            Lifecycle::Unmounted | Lifecycle::Dismissed => {
                self.mounts += 1;
                let mount = MountId(self.mounts);
                self.lifecycle = Lifecycle::Mounted(mount);
                dispatch_bridge_command(
                    &self.cmd_tx,
                    BridgeCommand::RefreshFlags { mount },
                    &mut self.status,
                );
            }
        }
        self.rerender()
    }

    /// Emits one pop to the router and stops accepting refresh results for this mount.
    pub fn on_dismiss_requested(&mut self) {
        if let Lifecycle::Mounted(mount) = self.lifecycle {
            tracing::debug!(mount = mount.0, "screen dismissed");
        }
        self.lifecycle = Lifecycle::Dismissed;
        self.router.pop();
    }

    /// Switches section. Only a mounted screen re-renders.
    pub fn select_section(&mut self, section: Section) -> Option<&RenderTree> {
        match self.lifecycle {
            Lifecycle::Mounted(_) => {
                self.selector.select(section);
                Some(self.rerender())
            }
            Lifecycle::Unmounted => {
                self.selector.select(section);
                None
            }
            Lifecycle::Dismissed => None,
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) -> EventEffect {
        if let Some(mount) = event.mount() {
            if self.lifecycle != Lifecycle::Mounted(mount) {
                tracing::debug!(
                    mount = mount.0,
                    lifecycle = ?self.lifecycle,
                    "discarding refresh result for inactive mount"
                );
                return EventEffect::Discarded;
            }
        }

        match event {
            UiEvent::FlagsRefreshed { outcome, .. } => {
                if outcome.activated() {
                    self.status = format!("Remote config activated (generation {})", outcome.generation());
                }
                self.settle_refresh()
            }
            UiEvent::FlagsRefreshFailed { error, .. } => {
                self.status = classify_refresh_failure(&error);
                self.settle_refresh()
            }
            UiEvent::FlagsActivated { generation } => {
                if !matches!(self.lifecycle, Lifecycle::Mounted(_)) {
                    tracing::debug!(generation, lifecycle = ?self.lifecycle, "activation ignored");
                    return EventEffect::Discarded;
                }
                if self.catch_up() {
                    EventEffect::Rerendered
                } else {
                    EventEffect::UpToDate
                }
            }
            UiEvent::Info(message) => {
                self.status = message;
                EventEffect::StatusUpdated
            }
        }
    }

    /// Applies every queued event without blocking. Returns how many re-renders happened.
    pub fn pump(&mut self) -> usize {
        let mut rerenders = 0;
        while let Ok(event) = self.ui_rx.try_recv() {
            if self.handle_event(event) == EventEffect::Rerendered {
                rerenders += 1;
            }
        }
        rerenders
    }

    /// Blocks until the refresh for the current mount has been applied or `timeout` passes.
    ///
    /// Returns `Rerendered` if any event re-rendered the screen while waiting, even when the
    /// mount's own refresh never arrives.
    pub fn wait_for_refresh(&mut self, timeout: Duration) -> Option<EventEffect> {
        let deadline = Instant::now() + timeout;
        let mut rerendered = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match self.ui_rx.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return rerendered.then_some(EventEffect::Rerendered);
                }
            };
            let settles = event.mount().is_some();
            match self.handle_event(event) {
                EventEffect::Rerendered if settles => return Some(EventEffect::Rerendered),
                EventEffect::Rerendered => rerendered = true,
                EventEffect::RefreshSettled if rerendered => return Some(EventEffect::Rerendered),
                EventEffect::RefreshSettled => return Some(EventEffect::RefreshSettled),
                EventEffect::StatusUpdated | EventEffect::UpToDate | EventEffect::Discarded => {}
            }
        }
    }

    pub fn tree(&self) -> Option<&RenderTree> {
        self.tree.as_ref()
    }

    pub fn section(&self) -> Section {
        self.selector.current()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Ends the current mount's refresh. The store may have moved on through another mount's
    /// refresh even when this one failed or changed nothing.
    fn settle_refresh(&mut self) -> EventEffect {
        if self.catch_up() {
            EventEffect::Rerendered
        } else {
            EventEffect::RefreshSettled
        }
    }

    /// Re-renders if the store generation differs from the one on screen.
    fn catch_up(&mut self) -> bool {
        if self.flags.generation() == self.rendered_generation {
            return false;
        }
        self.rerender();
        true
    }

    fn rerender(&mut self) -> &RenderTree {
        let snapshot = self.flags.snapshot();
        let tree = render(&self.recipe, self.selector.current(), &snapshot);
        self.rendered_generation = snapshot.generation();
        self.renders += 1;
        self.tree.insert(tree)
    }
}
