use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use shared::error::FetchError;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

mod http;
mod snapshot;

pub use http::HttpRemoteConfigBackend;
pub use snapshot::FlagSnapshot;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Resolved result of one backend fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedConfig {
    /// Complete key/value set to activate.
    Values(HashMap<String, String>),
    /// The backend reports the active template has not changed.
    Unchanged,
}

#[async_trait]
pub trait RemoteConfigBackend: Send + Sync {
    async fn fetch_and_activate(&self) -> Result<FetchedConfig, FetchError>;
}

pub struct MissingRemoteConfigBackend;

#[async_trait]
impl RemoteConfigBackend for MissingRemoteConfigBackend {
    async fn fetch_and_activate(&self) -> Result<FetchedConfig, FetchError> {
        Err(FetchError::Unavailable)
    }
}

/// Serves a fixed value set. Handy for offline previews.
pub struct StaticRemoteConfigBackend {
    values: HashMap<String, String>,
}

impl StaticRemoteConfigBackend {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl RemoteConfigBackend for StaticRemoteConfigBackend {
    async fn fetch_and_activate(&self) -> Result<FetchedConfig, FetchError> {
        Ok(FetchedConfig::Values(self.values.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagStoreSettings {
    /// Upper bound for one fetch. Zero disables the bound.
    pub fetch_timeout: Duration,
    /// Refreshes closer than this to the last successful fetch skip the backend.
    /// Zero disables throttling.
    pub minimum_fetch_interval: Duration,
}

impl Default for FlagStoreSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            minimum_fetch_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Activated { generation: u64 },
    Unchanged { generation: u64 },
    Throttled { generation: u64 },
}

impl RefreshOutcome {
    /// Generation of the snapshot that is active after the refresh.
    pub fn generation(self) -> u64 {
        match self {
            RefreshOutcome::Activated { generation }
            | RefreshOutcome::Unchanged { generation }
            | RefreshOutcome::Throttled { generation } => generation,
        }
    }

    pub fn activated(self) -> bool {
        matches!(self, RefreshOutcome::Activated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagStoreEvent {
    Activated { generation: u64 },
    FetchFailed(FetchError),
}

#[derive(Default)]
struct RefreshState {
    last_fetch_ok: Option<Instant>,
}

/// Last-known remote flags with an asynchronous fetch-and-activate cycle.
///
/// Readers go through [`RemoteFlagStore::get`] or [`RemoteFlagStore::snapshot`] and never wait
/// on the network. A refresh builds a complete new [`FlagSnapshot`] and swaps it in under the
/// write lock, so a reader sees either the old set or the new set, never a mix. Refreshes are
/// serialized: a second caller waits for the in-flight fetch before starting its own.
pub struct RemoteFlagStore {
    backend: Arc<dyn RemoteConfigBackend>,
    defaults: HashMap<String, String>,
    settings: FlagStoreSettings,
    snapshot: RwLock<Arc<FlagSnapshot>>,
    refresh_gate: Mutex<RefreshState>,
    events: broadcast::Sender<FlagStoreEvent>,
}

impl RemoteFlagStore {
    pub fn new(backend: Arc<dyn RemoteConfigBackend>) -> Arc<Self> {
        Self::with_settings(backend, HashMap::new(), FlagStoreSettings::default())
    }

    pub fn with_settings(
        backend: Arc<dyn RemoteConfigBackend>,
        defaults: HashMap<String, String>,
        settings: FlagStoreSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            backend,
            snapshot: RwLock::new(Arc::new(FlagSnapshot::with_defaults(defaults.clone()))),
            defaults,
            settings,
            refresh_gate: Mutex::new(RefreshState::default()),
            events,
        })
    }

    pub fn get(&self, key: &str, fallback: &str) -> String {
        self.snapshot.read().get(key, fallback).to_string()
    }

    pub fn snapshot(&self) -> Arc<FlagSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation()
    }

    pub fn settings(&self) -> FlagStoreSettings {
        self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlagStoreEvent> {
        self.events.subscribe()
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, FetchError> {
        let mut state = self.refresh_gate.lock().await;
        let current = self.generation();

        if let Some(last_fetch_ok) = state.last_fetch_ok {
            let interval = self.settings.minimum_fetch_interval;
            if !interval.is_zero() && last_fetch_ok.elapsed() < interval {
                debug!(generation = current, ?interval, "remote config refresh throttled");
                return Ok(RefreshOutcome::Throttled {
                    generation: current,
                });
            }
        }

        let fetched = match self.fetch_with_timeout().await {
            Ok(fetched) => fetched,
            Err(error) => {
                warn!(%error, generation = current, "remote config refresh failed; keeping previous snapshot");
                let _ = self.events.send(FlagStoreEvent::FetchFailed(error.clone()));
                return Err(error);
            }
        };
        state.last_fetch_ok = Some(Instant::now());

        match fetched {
            FetchedConfig::Unchanged => {
                debug!(generation = current, "remote config unchanged");
                Ok(RefreshOutcome::Unchanged {
                    generation: current,
                })
            }
            FetchedConfig::Values(values) => {
                let generation = current + 1;
                let key_count = values.len();
                let next = FlagSnapshot::activated(&self.defaults, values, generation, Utc::now());
                *self.snapshot.write() = Arc::new(next);
                info!(generation, key_count, "activated remote config snapshot");
                let _ = self.events.send(FlagStoreEvent::Activated { generation });
                Ok(RefreshOutcome::Activated { generation })
            }
        }
    }

    async fn fetch_with_timeout(&self) -> Result<FetchedConfig, FetchError> {
        let timeout = self.settings.fetch_timeout;
        if timeout.is_zero() {
            return self.backend.fetch_and_activate().await;
        }
        match tokio::time::timeout(timeout, self.backend.fetch_and_activate()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
