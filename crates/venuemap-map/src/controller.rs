//! The controller task and its handle.
//!
//! All published state is owned by one task. Viewport changes, reloads,
//! filters and the results of background fetches arrive as [`Command`]s on a
//! single channel and are applied strictly in arrival order. Network work runs
//! on spawned tasks that post their outcome back as another command; nothing
//! outside the controller task writes to the state.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use venuemap_core::{MapConfig, RegionFilter, VenueRecord, ViewportBounds, visible_markers};
use venuemap_sync::{BulkLoader, VenueStore};

use crate::{MapError, MapState};

#[derive(Debug)]
enum Command {
    ViewportChanged(ViewportBounds),
    Reload,
    LoadProgress(f64),
    LoadFinished(Result<Vec<VenueRecord>, String>),
    FilterVenues(RegionFilter),
    RefreshRegions,
    RegionsFetched(Result<Vec<String>, String>),
    FetchAuthorities(String),
    AuthoritiesFetched {
        region: String,
        result: Result<Vec<String>, String>,
    },
    Select(i64),
    ClearSelection,
    Flush(oneshot::Sender<()>),
}

/// Spawns the controller task.
pub struct MapController;

impl MapController {
    /// Start a controller on the current tokio runtime.
    ///
    /// The initial bulk load and region catalogue fetch are queued before the
    /// handle is returned. The task exits once every [`MapHandle`] is dropped
    /// and no background fetch is still running.
    pub fn spawn(store: Arc<dyn VenueStore>, config: MapConfig) -> Result<MapHandle, MapError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut initial = MapState::new(config.initial_viewport);
        initial.is_loading = true;
        let (state_tx, state_rx) = watch::channel(initial);

        let actor = MapActor {
            loader: BulkLoader::from_config(&config),
            marker_limit: config.marker_limit,
            store,
            venues: Arc::new(Vec::new()),
            loads_in_flight: 0,
            state: state_tx,
            commands: tx.downgrade(),
        };

        tx.send(Command::Reload).map_err(|_| MapError::Closed)?;
        tx.send(Command::RefreshRegions)
            .map_err(|_| MapError::Closed)?;
        tokio::spawn(actor.run(rx));

        Ok(MapHandle {
            commands: tx,
            state: state_rx,
        })
    }
}

struct MapActor {
    store: Arc<dyn VenueStore>,
    loader: BulkLoader,
    marker_limit: usize,
    venues: Arc<Vec<VenueRecord>>,
    loads_in_flight: usize,
    state: watch::Sender<MapState>,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl MapActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        debug!("map controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::ViewportChanged(bounds) => self.refresh_markers(Some(bounds), false),
            Command::Reload => self.start_load(),
            Command::LoadProgress(fraction) => {
                self.state.send_modify(|s| s.loading_progress = fraction);
            }
            Command::LoadFinished(result) => self.finish_load(result),
            Command::FilterVenues(filter) => {
                if !filter.is_noop() {
                    self.venues = Arc::new(filter.apply(&self.venues));
                }
                info!(
                    region = ?filter.region,
                    authority = ?filter.authority,
                    remaining = self.venues.len(),
                    "applied region filter"
                );
                self.refresh_markers(None, true);
            }
            Command::RefreshRegions => self.spawn_fetch(|store, tx| async move {
                let result = store.fetch_regions().await.map_err(|e| e.to_string());
                let _ = tx.send(Command::RegionsFetched(result));
            }),
            Command::RegionsFetched(Ok(regions)) => {
                self.state.send_modify(|s| s.regions = regions);
            }
            Command::RegionsFetched(Err(message)) => {
                warn!(error = %message, "region fetch failed");
                self.state
                    .send_modify(|s| s.last_error = Some(format!("Failed to fetch regions: {message}")));
            }
            Command::FetchAuthorities(region) => self.spawn_fetch(|store, tx| async move {
                let result = store
                    .fetch_authorities(&region)
                    .await
                    .map_err(|e| e.to_string());
                let _ = tx.send(Command::AuthoritiesFetched { region, result });
            }),
            Command::AuthoritiesFetched {
                region,
                result: Ok(authorities),
            } => {
                self.state.send_modify(|s| {
                    s.authorities_by_region.insert(region, authorities);
                });
            }
            Command::AuthoritiesFetched {
                region,
                result: Err(message),
            } => {
                warn!(region = %region, error = %message, "authority fetch failed");
                self.state.send_modify(|s| {
                    s.last_error = Some(format!("Failed to fetch authorities: {message}"));
                });
            }
            Command::Select(id) => {
                let venue = self.venues.iter().find(|v| v.id == id).cloned();
                if venue.is_none() {
                    debug!(id, "selected venue not in collection");
                }
                self.state.send_modify(|s| s.selected = venue);
            }
            Command::ClearSelection => self.state.send_modify(|s| s.selected = None),
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Recompute markers from the held collection and publish them together
    /// with the viewport they belong to (and the collection, if it changed).
    fn refresh_markers(&self, viewport: Option<ViewportBounds>, publish_venues: bool) {
        let bounds = viewport.unwrap_or_else(|| self.state.borrow().viewport);
        let markers = visible_markers(&self.venues, &bounds, self.marker_limit);
        self.state.send_modify(|s| {
            s.viewport = bounds;
            s.too_many_markers = markers.too_many_markers;
            s.annotations = Arc::new(markers.annotations);
            if publish_venues {
                s.venues = Arc::clone(&self.venues);
            }
        });
    }

    fn start_load(&mut self) {
        if self.loads_in_flight > 0 {
            warn!(
                in_flight = self.loads_in_flight,
                "bulk load requested while another is running"
            );
        }
        self.loads_in_flight += 1;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.last_error = None;
            s.loading_progress = 0.0;
        });

        let loader = self.loader;
        self.spawn_fetch(move |store, tx| async move {
            let result = loader
                .load_all(store.as_ref(), |fraction| {
                    let _ = tx.send(Command::LoadProgress(fraction));
                })
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Command::LoadFinished(result));
        });
    }

    fn finish_load(&mut self, result: Result<Vec<VenueRecord>, String>) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        let still_loading = self.loads_in_flight > 0;

        match result {
            Ok(venues) => {
                info!(count = venues.len(), "venue collection replaced");
                self.venues = Arc::new(venues);
                let bounds = self.state.borrow().viewport;
                let markers = visible_markers(&self.venues, &bounds, self.marker_limit);
                self.state.send_modify(|s| {
                    s.venues = Arc::clone(&self.venues);
                    s.too_many_markers = markers.too_many_markers;
                    s.annotations = Arc::new(markers.annotations);
                    s.last_error = None;
                    s.loading_progress = 1.0;
                    s.is_loading = still_loading;
                    s.loads_completed += 1;
                    s.last_loaded_at = Some(Utc::now());
                });
            }
            Err(message) => {
                warn!(error = %message, "bulk venue load failed");
                self.venues = Arc::new(Vec::new());
                self.state.send_modify(|s| {
                    s.venues = Arc::clone(&self.venues);
                    s.annotations = Arc::new(Vec::new());
                    s.too_many_markers = false;
                    s.last_error = Some(message);
                    s.loading_progress = 0.0;
                    s.is_loading = still_loading;
                    s.loads_completed += 1;
                });
            }
        }
    }

    /// Run `work` on a background task with its own sender back to this actor.
    fn spawn_fetch<F, Fut>(&self, work: F)
    where
        F: FnOnce(Arc<dyn VenueStore>, mpsc::UnboundedSender<Command>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(tx) = self.commands.upgrade() else {
            return;
        };
        tokio::spawn(work(Arc::clone(&self.store), tx));
    }
}

/// Cloneable handle for sending input to a controller and observing its state.
#[derive(Clone)]
pub struct MapHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<MapState>,
}

impl MapHandle {
    fn send(&self, command: Command) -> Result<(), MapError> {
        self.commands.send(command).map_err(|_| MapError::Closed)
    }

    /// The visible map region moved; recompute markers for `bounds`.
    pub fn viewport_changed(&self, bounds: ViewportBounds) -> Result<(), MapError> {
        self.send(Command::ViewportChanged(bounds))
    }

    /// Start a fresh bulk load. Loads already running are not cancelled.
    pub fn reload(&self) -> Result<(), MapError> {
        self.send(Command::Reload)
    }

    /// Narrow the held collection to one county (and optionally one local
    /// authority). The narrowing persists until the next successful reload.
    pub fn filter_venues(
        &self,
        region: Option<String>,
        authority: Option<String>,
    ) -> Result<(), MapError> {
        self.send(Command::FilterVenues(RegionFilter::new(region, authority)))
    }

    pub fn refresh_regions(&self) -> Result<(), MapError> {
        self.send(Command::RefreshRegions)
    }

    pub fn fetch_authorities(&self, region: impl Into<String>) -> Result<(), MapError> {
        self.send(Command::FetchAuthorities(region.into()))
    }

    pub fn select(&self, id: i64) -> Result<(), MapError> {
        self.send(Command::Select(id))
    }

    pub fn clear_selection(&self) -> Result<(), MapError> {
        self.send(Command::ClearSelection)
    }

    /// Resolve once every command sent before this call has been applied.
    ///
    /// Background fetches started by those commands may still be running.
    pub async fn flush(&self) -> Result<(), MapError> {
        let (done, applied) = oneshot::channel();
        self.send(Command::Flush(done))?;
        applied.await.map_err(|_| MapError::Closed)
    }

    /// A fresh receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<MapState> {
        self.state.clone()
    }

    /// The latest published state.
    pub fn snapshot(&self) -> MapState {
        self.state.borrow().clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> Result<MapState, MapError>
    where
        F: FnMut(&MapState) -> bool,
    {
        let mut rx = self.state.clone();
        let state = rx.wait_for(predicate).await.map_err(|_| MapError::Closed)?;
        Ok(state.clone())
    }

    /// Wait until more than `completed_before` bulk loads have finished and
    /// none is running.
    pub async fn wait_for_load(&self, completed_before: u64) -> Result<MapState, MapError> {
        self.wait_for(|s| s.loads_completed > completed_before && !s.is_loading)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use venuemap_core::{Coordinate, EventRecord};
    use venuemap_sync::{MemoryStore, SyncError};

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// A [`MemoryStore`] that can be told to fail a page or the region query.
    struct FlakyStore {
        inner: MemoryStore,
        page_size: usize,
        fail_page: AtomicUsize,
        fail_regions: AtomicBool,
    }

    impl FlakyStore {
        fn new(venues: Vec<VenueRecord>, page_size: usize) -> Self {
            Self {
                inner: MemoryStore::new(venues),
                page_size,
                fail_page: AtomicUsize::new(usize::MAX),
                fail_regions: AtomicBool::new(false),
            }
        }

        fn fail_page(&self, page: usize) {
            self.fail_page.store(page, Ordering::SeqCst);
        }

        fn heal(&self) {
            self.fail_page.store(usize::MAX, Ordering::SeqCst);
        }
    }

    fn unavailable() -> SyncError {
        SyncError::Server {
            status: 503,
            body: "upstream unavailable".into(),
        }
    }

    #[async_trait]
    impl VenueStore for FlakyStore {
        async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<VenueRecord>, SyncError> {
            if offset / self.page_size == self.fail_page.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            self.inner.fetch_page(offset, limit).await
        }

        async fn fetch_venue(&self, id: i64) -> Result<Option<VenueRecord>, SyncError> {
            self.inner.fetch_venue(id).await
        }

        async fn fetch_regions(&self) -> Result<Vec<String>, SyncError> {
            if self.fail_regions.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            self.inner.fetch_regions().await
        }

        async fn fetch_authorities(&self, region: &str) -> Result<Vec<String>, SyncError> {
            self.inner.fetch_authorities(region).await
        }

        async fn fetch_events(
            &self,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<EventRecord>, SyncError> {
            self.inner.fetch_events(offset, limit).await
        }
    }

    fn venue(id: i64, lat: Option<&str>, lon: Option<&str>) -> VenueRecord {
        VenueRecord::new(id, format!("Venue {id}")).with_position(lat, lon)
    }

    fn located(id: i64, county: &str, authority: &str) -> VenueRecord {
        let mut v = venue(id, Some("51.5"), Some("-0.12"));
        v.county = county.into();
        v.local_authority = Some(authority.into());
        v
    }

    fn london() -> ViewportBounds {
        ViewportBounds::new(Coordinate::new(51.50, -0.12), 0.2, 0.2)
    }

    fn config(page_size: usize) -> MapConfig {
        MapConfig {
            page_size,
            initial_viewport: london(),
            ..MapConfig::default()
        }
    }

    fn ids(state: &MapState) -> Vec<i64> {
        state.annotations.iter().map(|a| a.id).collect()
    }

    async fn loaded(handle: &MapHandle) -> MapState {
        tokio::time::timeout(TIMEOUT, handle.wait_for_load(0))
            .await
            .expect("load timed out")
            .unwrap()
    }

    #[tokio::test]
    async fn initial_load_filters_to_viewport() {
        let store = Arc::new(MemoryStore::new(vec![
            venue(1, Some("51.50"), Some("-0.12")),
            venue(2, Some("60.0"), Some("-1.0")),
            venue(3, None, Some("-0.13")),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();

        let state = loaded(&handle).await;
        assert_eq!(state.venues.len(), 3);
        assert_eq!(ids(&state), vec![1]);
        assert!(!state.too_many_markers);
        assert_eq!(state.loading_progress, 1.0);
        assert!(state.last_error.is_none());
        assert!(state.last_loaded_at.is_some());
    }

    #[tokio::test]
    async fn caps_markers_after_load() {
        let venues = (1..=1500).map(|id| venue(id, Some("51.5"), Some("-0.12"))).collect();
        let handle = MapController::spawn(Arc::new(MemoryStore::new(venues)), config(1000)).unwrap();

        let state = loaded(&handle).await;
        assert!(state.too_many_markers);
        assert_eq!(state.annotations.len(), 1000);
        assert_eq!(ids(&state), (1..=1000).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_page_empties_the_collection() {
        let venues: Vec<VenueRecord> = (1..=2500)
            .map(|id| venue(id, Some("51.5"), Some("-0.12")))
            .collect();
        let store = Arc::new(FlakyStore::new(venues, 1000));
        store.fail_page(1);
        let handle = MapController::spawn(store, config(1000)).unwrap();

        let state = loaded(&handle).await;
        assert!(state.venues.is_empty());
        assert!(state.annotations.is_empty());
        assert!(!state.too_many_markers);
        assert_eq!(state.loading_progress, 0.0);
        let error = state.last_error.expect("error published");
        assert!(error.contains("503"), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn failed_reload_discards_previous_collection() {
        let venues: Vec<VenueRecord> = (1..=30)
            .map(|id| venue(id, Some("51.5"), Some("-0.12")))
            .collect();
        let store = Arc::new(FlakyStore::new(venues, 10));
        let handle = MapController::spawn(store.clone(), config(10)).unwrap();
        assert_eq!(loaded(&handle).await.venues.len(), 30);

        store.fail_page(2);
        handle.reload().unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for_load(1))
            .await
            .unwrap()
            .unwrap();
        assert!(state.venues.is_empty());
        assert!(state.annotations.is_empty());
        assert!(state.last_error.is_some());

        // A later successful reload clears the error and restores markers.
        store.heal();
        handle.reload().unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for_load(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.venues.len(), 30);
        assert_eq!(state.annotations.len(), 30);
        assert!(state.last_error.is_none());
    }

    /// Fails the first page request it sees and answers later ones slowly.
    struct FirstCallFails {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VenueStore for FirstCallFails {
        async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<VenueRecord>, SyncError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(unavailable());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.fetch_page(offset, limit).await
        }

        async fn fetch_venue(&self, id: i64) -> Result<Option<VenueRecord>, SyncError> {
            self.inner.fetch_venue(id).await
        }

        async fn fetch_regions(&self) -> Result<Vec<String>, SyncError> {
            self.inner.fetch_regions().await
        }

        async fn fetch_authorities(&self, region: &str) -> Result<Vec<String>, SyncError> {
            self.inner.fetch_authorities(region).await
        }

        async fn fetch_events(
            &self,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<EventRecord>, SyncError> {
            self.inner.fetch_events(offset, limit).await
        }
    }

    #[tokio::test]
    async fn overlapping_success_clears_earlier_failure() {
        let store = Arc::new(FirstCallFails {
            inner: MemoryStore::new(vec![venue(1, Some("51.50"), Some("-0.12"))]),
            calls: AtomicUsize::new(0),
        });
        let handle = MapController::spawn(store, config(1000)).unwrap();
        handle.reload().unwrap();

        let state = tokio::time::timeout(TIMEOUT, handle.wait_for_load(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.loads_completed, 2);
        assert_eq!(state.venues.len(), 1);
        assert_eq!(ids(&state), vec![1]);
        assert_eq!(state.loading_progress, 1.0);
        assert!(state.last_error.is_none(), "stale error: {:?}", state.last_error);
    }

    #[tokio::test]
    async fn viewport_changes_recompute_in_order() {
        let store = Arc::new(MemoryStore::new(vec![
            venue(1, Some("51.50"), Some("-0.12")),
            venue(2, Some("53.48"), Some("-2.24")),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();
        loaded(&handle).await;

        let manchester = ViewportBounds::new(Coordinate::new(53.48, -2.24), 0.1, 0.1);
        let nowhere = ViewportBounds::new(Coordinate::new(0.0, 0.0), 0.1, 0.1);
        handle.viewport_changed(manchester).unwrap();
        handle.viewport_changed(nowhere).unwrap();
        handle.viewport_changed(manchester).unwrap();

        tokio::time::timeout(TIMEOUT, handle.flush())
            .await
            .unwrap()
            .unwrap();
        let state = handle.snapshot();
        assert_eq!(state.viewport, manchester);
        assert_eq!(ids(&state), vec![2]);
    }

    #[tokio::test]
    async fn same_viewport_twice_is_identical() {
        let venues = (1..=20)
            .map(|id| {
                let lat = format!("{}", 51.41 + id as f64 * 0.005);
                venue(id, Some(&lat), Some("-0.12"))
            })
            .collect();
        let handle = MapController::spawn(Arc::new(MemoryStore::new(venues)), config(1000)).unwrap();
        let first = loaded(&handle).await;

        handle.viewport_changed(london()).unwrap();
        handle.select(1).unwrap();
        let second = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.selected.is_some()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.annotations, second.annotations);
    }

    #[tokio::test]
    async fn region_filter_narrows_until_reload() {
        let store = Arc::new(MemoryStore::new(vec![
            located(1, "Kent", "Dover"),
            located(2, "Essex", "Colchester"),
            located(3, "Kent", "Canterbury"),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();
        loaded(&handle).await;

        handle.filter_venues(Some("Kent".into()), None).unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.venues.len() == 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&state), vec![1, 3]);

        // Filters compound on the already narrowed collection.
        handle
            .filter_venues(Some("Essex".into()), None)
            .unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.venues.is_empty()))
            .await
            .unwrap()
            .unwrap();
        assert!(state.annotations.is_empty());

        handle.reload().unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for_load(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&state), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn region_and_authority_filter() {
        let store = Arc::new(MemoryStore::new(vec![
            located(1, "Kent", "Dover"),
            located(2, "Kent", "Canterbury"),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();
        loaded(&handle).await;

        handle
            .filter_venues(Some("Kent".into()), Some("Canterbury".into()))
            .unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.venues.len() == 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&state), vec![2]);
    }

    #[tokio::test]
    async fn selection_by_identifier() {
        let store = Arc::new(MemoryStore::new(vec![
            located(1, "Kent", "Dover"),
            located(2, "Kent", "Canterbury"),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();
        loaded(&handle).await;

        handle.select(2).unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.selected.is_some()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.selected.as_ref().map(|v| v.id), Some(2));
        assert_eq!(state.selected_annotation().map(|a| a.id), Some(2));

        handle.select(99).unwrap();
        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| s.selected.is_none()))
            .await
            .unwrap()
            .unwrap();
        assert!(state.selected_annotation().is_none());
    }

    #[tokio::test]
    async fn regions_fetched_at_start_and_authorities_on_demand() {
        let store = Arc::new(MemoryStore::new(vec![
            located(1, "Kent", "Dover"),
            located(2, "Essex", "Colchester"),
            located(3, "Kent", "Canterbury"),
        ]));
        let handle = MapController::spawn(store, config(1000)).unwrap();

        let state = tokio::time::timeout(TIMEOUT, handle.wait_for(|s| !s.regions.is_empty()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.regions, vec!["Essex", "Kent"]);

        handle.fetch_authorities("Kent").unwrap();
        let state = tokio::time::timeout(
            TIMEOUT,
            handle.wait_for(|s| s.authorities_by_region.contains_key("Kent")),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(state.authorities_by_region["Kent"], vec!["Canterbury", "Dover"]);
    }

    #[tokio::test]
    async fn region_fetch_failure_is_reported() {
        let store = Arc::new(FlakyStore::new(vec![located(1, "Kent", "Dover")], 1000));
        store.fail_regions.store(true, Ordering::SeqCst);
        let handle = MapController::spawn(store, config(1000)).unwrap();

        let state = tokio::time::timeout(
            TIMEOUT,
            handle.wait_for(|s| {
                s.last_error
                    .as_deref()
                    .is_some_and(|e| e.starts_with("Failed to fetch regions:"))
            }),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(state.regions.is_empty());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = MapConfig {
            marker_limit: 0,
            ..MapConfig::default()
        };
        let result = MapController::spawn(Arc::new(MemoryStore::default()), config);
        assert!(matches!(result, Err(MapError::Config(_))));
    }

    #[tokio::test]
    async fn controller_stops_when_handles_drop() {
        let handle = MapController::spawn(Arc::new(MemoryStore::default()), config(1000)).unwrap();
        let mut rx = handle.subscribe();
        loaded(&handle).await;
        drop(handle);

        let closed = tokio::time::timeout(TIMEOUT, async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok(), "controller did not shut down");
    }
}
