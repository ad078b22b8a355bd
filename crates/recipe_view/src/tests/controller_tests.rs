use super::*;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender};
use remote_config::{
    FetchedConfig, MissingRemoteConfigBackend, RefreshOutcome, RemoteConfigBackend,
    RemoteFlagStore, StaticRemoteConfigBackend,
};
use shared::{
    domain::{Ingredient, Recipe, RecipeId, Section},
    error::FetchError,
};
use tokio::sync::Semaphore;

const WAIT: Duration = Duration::from_secs(5);

/// Holds every fetch until the test opens the gate. Fetches past `successes` fail.
struct GatedBackend {
    gate: Semaphore,
    calls: AtomicUsize,
    served: AtomicUsize,
    successes: usize,
    style: &'static str,
}

impl GatedBackend {
    fn new(style: &'static str) -> Arc<Self> {
        Self::succeeding(style, usize::MAX)
    }

    fn succeeding(style: &'static str, successes: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
            successes,
            style,
        })
    }

    fn open(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConfigBackend for GatedBackend {
    async fn fetch_and_activate(&self) -> Result<FetchedConfig, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchError::Unavailable)?;
        permit.forget();
        if self.served.fetch_add(1, Ordering::SeqCst) >= self.successes {
            return Err(FetchError::Transport("connection reset".into()));
        }
        let values: HashMap<String, String> = [("stepsStyle".to_string(), self.style.to_string())]
            .into_iter()
            .collect();
        Ok(FetchedConfig::Values(values))
    }
}

fn tea() -> Arc<Recipe> {
    Arc::new(Recipe {
        name: "Tea".into(),
        description: None,
        time: 5,
        ingredients: vec![Ingredient::new(1.0, "cup", "water")],
        steps: vec!["Boil water".into(), "Steep".into()],
        image_url: None,
    })
}

fn screen<R: Router>(
    backend: Arc<dyn RemoteConfigBackend>,
    router: R,
) -> (ScreenController<R>, Arc<RemoteFlagStore>, Sender<BridgeCommand>) {
    let flags = RemoteFlagStore::new(backend);
    let (cmd_tx, cmd_rx) = bounded(16);
    let (ui_tx, ui_rx) = bounded(16);
    launch_bridge(Arc::clone(&flags), cmd_rx, ui_tx).expect("bridge thread");
    let controller = ScreenController::new(tea(), Arc::clone(&flags), router, cmd_tx.clone(), ui_rx);
    (controller, flags, cmd_tx)
}

/// A screen with no bridge behind it; the test feeds events through `handle_event`.
fn detached_screen(
    flags: Arc<RemoteFlagStore>,
) -> (ScreenController<NavigationPath>, Receiver<BridgeCommand>) {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (_ui_tx, ui_rx) = bounded::<UiEvent>(16);
    let controller = ScreenController::new(tea(), flags, NavigationPath::default(), cmd_tx, ui_rx);
    (controller, cmd_rx)
}

fn refresh_now(flags: &RemoteFlagStore) -> RefreshOutcome {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(flags.refresh())
        .expect("refresh")
}

fn circle_store() -> Arc<RemoteFlagStore> {
    let values: HashMap<String, String> = [("stepsStyle".to_string(), "circle".to_string())]
        .into_iter()
        .collect();
    RemoteFlagStore::new(Arc::new(StaticRemoteConfigBackend::new(values)))
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn rows(controller: &ScreenController<NavigationPath>) -> Vec<String> {
    controller.tree().expect("rendered").body.row_lines()
}

#[test]
fn mount_renders_before_refresh_and_rerenders_on_activation() {
    let backend = GatedBackend::new("circle");
    let (mut controller, _flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());
    controller.select_section(Section::Instructions);

    let initial = controller.on_mount().body.row_lines();
    assert_eq!(initial, vec!["1.square Boil water", "2.square Steep"]);
    assert_eq!(controller.renders(), 1);

    backend.open(1);
    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::Rerendered));

    assert_eq!(rows(&controller), vec!["1.circle Boil water", "2.circle Steep"]);
    assert_eq!(controller.renders(), 2);
    assert!(controller.status().contains("generation 1"));
}

#[test]
fn refresh_is_queued_once_per_mount() {
    let backend = GatedBackend::new("circle");
    let (mut controller, _flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());

    controller.on_mount();
    controller.on_mount();
    backend.open(2);

    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::Rerendered));
    assert_eq!(controller.wait_for_refresh(Duration::from_millis(200)), None);
    assert_eq!(backend.calls(), 1);
}

#[test]
fn result_arriving_after_dismiss_is_discarded() {
    let backend = GatedBackend::new("circle");
    let mut path = NavigationPath::default();
    path.push(Route::RecipeDetails(RecipeId(1)));
    let (mut controller, flags, _cmd_tx) = screen(backend.clone(), path);
    controller.select_section(Section::Instructions);
    controller.on_mount();

    controller.on_dismiss_requested();
    backend.open(1);

    assert!(wait_until(|| flags.generation() == 1));
    assert_eq!(controller.wait_for_refresh(Duration::from_millis(200)), None);
    assert_eq!(controller.pump(), 0);
    assert_eq!(controller.renders(), 1);
    assert_eq!(rows(&controller), vec!["1.square Boil water", "2.square Steep"]);
    assert_eq!(controller.lifecycle(), Lifecycle::Dismissed);
    assert_eq!(controller.router().depth(), 0);
}

#[test]
fn remount_ignores_results_addressed_to_the_previous_mount() {
    let backend = GatedBackend::new("circle");
    let (mut controller, _flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());

    controller.on_mount();
    controller.on_dismiss_requested();
    controller.on_mount();
    assert_eq!(controller.lifecycle(), Lifecycle::Mounted(MountId(2)));

    backend.open(2);
    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::Rerendered));
    assert_eq!(backend.calls(), 2);
}

#[test]
fn remount_shows_flags_activated_by_the_previous_mounts_refresh() {
    let backend = GatedBackend::succeeding("circle", 1);
    let (mut controller, flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());
    controller.select_section(Section::Instructions);

    controller.on_mount();
    controller.on_dismiss_requested();
    controller.on_mount();
    backend.open(2);

    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::Rerendered));
    assert!(wait_until(|| backend.calls() == 2));
    assert_eq!(flags.generation(), 1);
    assert_eq!(rows(&controller), vec!["1.circle Boil water", "2.circle Steep"]);
}

#[test]
fn settled_refresh_catches_up_with_store_generation() {
    let flags = circle_store();
    let (mut controller, _cmd_rx) = detached_screen(Arc::clone(&flags));
    controller.select_section(Section::Instructions);
    controller.on_mount();
    controller.on_dismiss_requested();
    controller.on_mount();

    let outcome = refresh_now(&flags);
    assert_eq!(
        controller.handle_event(UiEvent::FlagsRefreshed { mount: MountId(1), outcome }),
        EventEffect::Discarded
    );
    assert_eq!(rows(&controller), vec!["1.square Boil water", "2.square Steep"]);

    let failed = UiEvent::FlagsRefreshFailed {
        mount: MountId(2),
        error: FetchError::Transport("connection reset".into()),
    };
    assert_eq!(controller.handle_event(failed.clone()), EventEffect::Rerendered);
    assert_eq!(rows(&controller), vec!["1.circle Boil water", "2.circle Steep"]);
    assert!(controller.status().contains("unreachable"));

    assert_eq!(controller.handle_event(failed), EventEffect::RefreshSettled);
    assert_eq!(controller.renders(), 3);
}

#[test]
fn unchanged_refresh_catches_up_with_store_generation() {
    let flags = circle_store();
    let (mut controller, _cmd_rx) = detached_screen(Arc::clone(&flags));
    controller.select_section(Section::Instructions);
    controller.on_mount();

    refresh_now(&flags);
    let effect = controller.handle_event(UiEvent::FlagsRefreshed {
        mount: MountId(1),
        outcome: RefreshOutcome::Unchanged { generation: 1 },
    });

    assert_eq!(effect, EventEffect::Rerendered);
    assert_eq!(rows(&controller), vec!["1.circle Boil water", "2.circle Steep"]);
}

#[test]
fn store_activation_outside_the_screen_rerenders_on_pump() {
    let backend = GatedBackend::new("circle");
    let (mut controller, flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());
    controller.select_section(Section::Instructions);
    controller.on_mount();
    backend.open(1);
    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::Rerendered));
    controller.pump();
    let renders = controller.renders();

    backend.open(1);
    assert_eq!(refresh_now(&flags), RefreshOutcome::Activated { generation: 2 });

    assert!(wait_until(|| controller.pump() > 0));
    assert_eq!(controller.renders(), renders + 1);
    assert_eq!(rows(&controller), vec!["1.circle Boil water", "2.circle Steep"]);
}

#[test]
fn activation_events_respect_lifecycle_and_rendered_generation() {
    let flags = circle_store();
    let (mut controller, _cmd_rx) = detached_screen(Arc::clone(&flags));
    refresh_now(&flags);

    let activated = UiEvent::FlagsActivated { generation: 1 };
    assert_eq!(controller.handle_event(activated.clone()), EventEffect::Discarded);
    assert_eq!(controller.renders(), 0);

    controller.on_mount();
    assert_eq!(controller.handle_event(activated.clone()), EventEffect::UpToDate);
    assert_eq!(controller.renders(), 1);

    controller.on_dismiss_requested();
    refresh_now(&flags);
    assert_eq!(
        controller.handle_event(UiEvent::FlagsActivated { generation: 2 }),
        EventEffect::Discarded
    );
    assert_eq!(controller.renders(), 1);
}

#[test]
fn failed_refresh_keeps_render_and_reports_status() {
    let (mut controller, flags, _cmd_tx) =
        screen(Arc::new(MissingRemoteConfigBackend), NavigationPath::default());
    controller.select_section(Section::Instructions);
    controller.on_mount();

    assert_eq!(controller.wait_for_refresh(WAIT), Some(EventEffect::RefreshSettled));

    assert_eq!(controller.renders(), 1);
    assert_eq!(flags.get("stepsStyle", "square"), "square");
    assert_eq!(rows(&controller), vec!["1.square Boil water", "2.square Steep"]);
    assert!(controller.status().contains("unavailable"));
}

#[test]
fn section_switch_rerenders_with_current_snapshot() {
    let backend = GatedBackend::new("circle.fill");
    let (mut controller, _flags, _cmd_tx) = screen(backend.clone(), NavigationPath::default());
    controller.on_mount();
    backend.open(1);
    controller.wait_for_refresh(WAIT);

    assert_eq!(rows(&controller), vec!["1 cup water"]);
    let tree = controller
        .select_section(Section::Instructions)
        .expect("mounted screen re-renders");
    assert_eq!(tree.body.row_lines(), vec!["1.circle.fill Boil water", "2.circle.fill Steep"]);
    assert_eq!(controller.section(), Section::Instructions);
}

#[test]
fn dismissed_screen_ignores_section_switches() {
    let (mut controller, _flags, _cmd_tx) =
        screen(Arc::new(MissingRemoteConfigBackend), NavigationPath::default());
    controller.on_mount();
    controller.on_dismiss_requested();

    assert!(controller.select_section(Section::Instructions).is_none());
    assert_eq!(controller.section(), Section::Ingredients);
}

#[test]
fn each_dismiss_emits_one_pop() {
    let (nav_tx, nav_rx) = bounded(4);
    let (mut controller, _flags, _cmd_tx) = screen(Arc::new(MissingRemoteConfigBackend), nav_tx);
    controller.on_mount();

    controller.on_dismiss_requested();
    assert_eq!(nav_rx.try_recv(), Ok(NavigationEvent::Pop));
    assert!(nav_rx.try_recv().is_err());

    controller.on_dismiss_requested();
    assert_eq!(nav_rx.try_recv(), Ok(NavigationEvent::Pop));
    assert!(nav_rx.try_recv().is_err());
}

#[test]
fn stopped_bridge_is_reported_on_mount() {
    let flags = RemoteFlagStore::new(Arc::new(MissingRemoteConfigBackend));
    let (cmd_tx, cmd_rx) = bounded(1);
    let (_ui_tx, ui_rx) = bounded::<UiEvent>(1);
    drop(cmd_rx);
    let mut controller =
        ScreenController::new(tea(), flags, NavigationPath::default(), cmd_tx, ui_rx);

    controller.on_mount();

    assert!(controller.status().contains("disconnected"));
    assert_eq!(controller.renders(), 1);
}

#[test]
fn info_events_only_touch_status() {
    let flags = RemoteFlagStore::new(Arc::new(MissingRemoteConfigBackend));
    let (cmd_tx, _cmd_rx) = bounded(1);
    let (_ui_tx, ui_rx) = bounded::<UiEvent>(1);
    let mut controller =
        ScreenController::new(tea(), flags, NavigationPath::default(), cmd_tx, ui_rx);
    controller.on_mount();

    let effect = controller.handle_event(UiEvent::Info("worker ready".into()));

    assert_eq!(effect, EventEffect::StatusUpdated);
    assert_eq!(controller.status(), "worker ready");
    assert_eq!(controller.renders(), 1);
}
