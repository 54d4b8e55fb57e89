//! Application State
//!
//! Tab-lifetime state shared by every view: the theme flag and the meme
//! catalog snapshot. Cloning an `AppState` is cheap and every clone sees the
//! same state.
//!
//! Each piece of state has exactly one mutation path (`toggle_theme` and the
//! one-shot `load_catalog`), and every change is announced on a broadcast
//! channel so views can re-render without polling.

use crate::remote::{MemeSource, MemeTemplate};
use crate::storage::MemeStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Change notifications published by `AppState`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    ThemeChanged { dark_mode: bool },
    CatalogLoaded { count: usize },
    CatalogFailed,
}

/// Where the one-time catalog load stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    /// No fetch issued yet
    Idle,
    /// Fetch in flight
    Loading,
    Loaded,
    /// Fetch failed; the list stays empty
    Failed,
}

#[derive(Debug)]
struct Catalog {
    status: CatalogStatus,
    memes: Arc<[MemeTemplate]>,
}

/// Shared application state for all views
#[derive(Clone)]
pub struct AppState {
    /// Persistent store the theme is read from and written through to
    store: Arc<MemeStore>,
    dark_mode: Arc<RwLock<bool>>,
    catalog: Arc<RwLock<Catalog>>,
    /// Set once the catalog fetch has been issued
    catalog_requested: Arc<AtomicBool>,
    events: broadcast::Sender<StateEvent>,
}

impl AppState {
    /// Create state with the theme read from `store` and an empty catalog
    pub fn new(store: Arc<MemeStore>) -> Self {
        let dark_mode = store.get_dark_mode();
        let (events, _) = broadcast::channel(64);

        tracing::debug!(dark_mode, "Application state initialised");

        Self {
            store,
            dark_mode: Arc::new(RwLock::new(dark_mode)),
            catalog: Arc::new(RwLock::new(Catalog {
                status: CatalogStatus::Idle,
                memes: Arc::from(Vec::new()),
            })),
            catalog_requested: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Create state and wait for the catalog fetch to finish
    pub async fn initialize(store: Arc<MemeStore>, source: &dyn MemeSource) -> Self {
        let state = Self::new(store);
        state.load_catalog(source).await;
        state
    }

    /// The injected persistent store
    pub fn store(&self) -> &Arc<MemeStore> {
        &self.store
    }

    /// Receive a `StateEvent` after every state change
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    // ============================================
    // Theme
    // ============================================

    pub fn dark_mode(&self) -> bool {
        *self.dark_mode.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Flip the theme, persist it and notify subscribers
    ///
    /// The new value is visible to every clone when this returns. A failed
    /// write is logged by the store; the in-memory flag still flips.
    ///
    /// The flag stays locked until the write-through and notification are
    /// done, so concurrent toggles persist and publish in flip order.
    pub fn toggle_theme(&self) -> bool {
        let mut flag = self.dark_mode.write().unwrap_or_else(|e| e.into_inner());
        *flag = !*flag;
        let dark_mode = *flag;

        if !self.store.set_dark_mode(dark_mode) {
            tracing::warn!(dark_mode, "Theme change not persisted");
        }
        self.publish(StateEvent::ThemeChanged { dark_mode });
        dark_mode
    }

    // ============================================
    // Catalog
    // ============================================

    /// Snapshot of the cached catalog
    pub fn memes(&self) -> Arc<[MemeTemplate]> {
        Arc::clone(&self.read_catalog().memes)
    }

    pub fn catalog_status(&self) -> CatalogStatus {
        self.read_catalog().status
    }

    pub fn is_catalog_loaded(&self) -> bool {
        self.catalog_status() == CatalogStatus::Loaded
    }

    /// Fetch the catalog once and cache it
    ///
    /// Only the first call fetches; later calls return the cached count
    /// without touching the network. A failed fetch leaves the list empty.
    pub async fn load_catalog(&self, source: &dyn MemeSource) -> usize {
        if self.catalog_requested.swap(true, Ordering::SeqCst) {
            return self.memes().len();
        }

        self.write_catalog(CatalogStatus::Loading, None);

        match source.fetch_memes().await {
            Ok(memes) => {
                let count = memes.len();
                self.write_catalog(CatalogStatus::Loaded, Some(memes));
                tracing::info!(source = source.name(), count, "Meme catalog loaded");
                self.publish(StateEvent::CatalogLoaded { count });
                count
            }
            Err(e) => {
                self.write_catalog(CatalogStatus::Failed, None);
                tracing::error!(source = source.name(), error = %e, "Error fetching memes");
                self.publish(StateEvent::CatalogFailed);
                0
            }
        }
    }

    /// Issue the catalog fetch in the background
    ///
    /// Dropping the handle does not cancel the fetch; its result still lands
    /// in this state.
    pub fn spawn_catalog_load(&self, source: Arc<dyn MemeSource>) -> JoinHandle<usize> {
        let state = self.clone();
        tokio::spawn(async move { state.load_catalog(source.as_ref()).await })
    }

    fn read_catalog(&self) -> std::sync::RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_catalog(&self, status: CatalogStatus, memes: Option<Vec<MemeTemplate>>) {
        let mut catalog = self.catalog.write().unwrap_or_else(|e| e.into_inner());
        catalog.status = status;
        if let Some(memes) = memes {
            catalog.memes = Arc::from(memes);
        }
    }

    fn publish(&self, event: StateEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use crate::storage::MemoryBackend;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct StubSource {
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn ok() -> Self {
            Self {
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MemeSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch_memes(&self) -> Result<Vec<MemeTemplate>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RemoteError::Unavailable);
            }
            Ok(vec![MemeTemplate {
                id: "181913649".to_string(),
                title: "Drake Hotline Bling".to_string(),
                url: "https://i.imgflip.com/30b1gx.jpg".to_string(),
                width: 1200,
                height: 1200,
                box_count: 2,
            }])
        }

        async fn caption_image(&self, _: &str, _: &[String]) -> Result<String, RemoteError> {
            Err(RemoteError::Unavailable)
        }
    }

    fn store() -> Arc<MemeStore> {
        Arc::new(MemeStore::in_memory())
    }

    #[test]
    fn test_theme_read_from_store() {
        let store = store();
        store.set_dark_mode(true);

        let state = AppState::new(store);
        assert!(state.dark_mode());
        assert_eq!(state.catalog_status(), CatalogStatus::Idle);
        assert!(state.memes().is_empty());
    }

    #[test]
    fn test_toggle_theme_writes_through() {
        let store = store();
        let state = AppState::new(Arc::clone(&store));
        let view = state.clone();
        let mut rx = state.subscribe();

        assert!(state.toggle_theme());
        assert!(view.dark_mode());
        assert!(store.get_dark_mode());
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::ThemeChanged { dark_mode: true }
        );

        assert!(!view.toggle_theme());
        assert!(!state.dark_mode());
        assert!(!store.get_dark_mode());
    }

    #[test]
    fn test_concurrent_toggles_keep_store_in_step() {
        let store = store();
        let state = AppState::new(Arc::clone(&store));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let view = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        view.toggle_theme();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 400 flips land back on light mode, in memory and on disk
        assert!(!state.dark_mode());
        assert_eq!(store.get_dark_mode(), state.dark_mode());
    }

    #[test]
    fn test_toggle_theme_survives_storage_failure() {
        let store = Arc::new(MemeStore::new(Arc::new(MemoryBackend::disabled())));
        let state = AppState::new(store);

        assert!(!state.dark_mode());
        assert!(state.toggle_theme());
        assert!(state.dark_mode());
    }

    #[tokio::test]
    async fn test_initialize_loads_catalog() {
        let source = StubSource::ok();
        let state = AppState::initialize(store(), &source).await;

        assert!(state.is_catalog_loaded());
        assert_eq!(state.memes().len(), 1);
        assert_eq!(state.memes()[0].id, "181913649");
    }

    #[tokio::test]
    async fn test_catalog_loads_once() {
        let source = StubSource::ok();
        let state = AppState::new(store());
        let mut rx = state.subscribe();

        assert_eq!(state.load_catalog(&source).await, 1);
        assert_eq!(state.load_catalog(&source).await, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv().unwrap(), StateEvent::CatalogLoaded { count: 1 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_catalog_failure_leaves_list_empty() {
        let source = StubSource::failing();
        let state = AppState::initialize(store(), &source).await;

        assert_eq!(state.catalog_status(), CatalogStatus::Failed);
        assert!(state.memes().is_empty());
        // Still usable
        assert!(state.toggle_theme());
    }

    #[tokio::test]
    async fn test_spawned_load_visible_to_clones() {
        let state = AppState::new(store());
        let view = state.clone();

        let handle = state.spawn_catalog_load(Arc::new(StubSource::ok()));
        assert_eq!(handle.await.unwrap(), 1);
        assert!(view.is_catalog_loaded());
        assert_eq!(view.memes().len(), 1);
    }
}
