//! The remote store seam and an in-memory implementation.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;
use venuemap_core::region::distinct_sorted;
use venuemap_core::{EventRecord, VenueRecord};

use crate::SyncError;

/// Read access to the venue directory backend.
///
/// Page requests are ordered by venue id and addressed by row offset, so
/// `fetch_page(p * n, n)` is page `p` of size `n`.
#[async_trait]
pub trait VenueStore: Send + Sync {
    /// Venue rows `[offset, offset + limit)` ordered by id.
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<VenueRecord>, SyncError>;

    /// A single venue by id, for the detail view.
    async fn fetch_venue(&self, id: i64) -> Result<Option<VenueRecord>, SyncError>;

    /// Distinct county names, trimmed and sorted.
    async fn fetch_regions(&self) -> Result<Vec<String>, SyncError>;

    /// Distinct local authorities within `region`, trimmed and sorted.
    async fn fetch_authorities(&self, region: &str) -> Result<Vec<String>, SyncError>;

    /// Event rows `[offset, offset + limit)` ordered by start time, venues embedded.
    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EventRecord>, SyncError>;
}

/// A [`VenueStore`] over rows held in memory.
///
/// Used for offline runs against a JSON export of the `Venue` table and as
/// the backing store in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    venues: Vec<VenueRecord>,
    events: Vec<EventRecord>,
}

impl MemoryStore {
    pub fn new(mut venues: Vec<VenueRecord>) -> Self {
        venues.sort_by_key(|v| v.id);
        Self {
            venues,
            events: Vec::new(),
        }
    }

    pub fn with_events(mut self, mut events: Vec<EventRecord>) -> Self {
        // Ascending by start with undated events last, as Postgres orders NULLs.
        events.sort_by(|a, b| {
            (a.event_start.is_none(), &a.event_start).cmp(&(b.event_start.is_none(), &b.event_start))
        });
        self.events = events;
        self
    }

    /// Load venues from a JSON array of `Venue` rows.
    pub async fn from_json_file(path: &Path) -> Result<Self, SyncError> {
        let bytes = tokio::fs::read(path).await?;
        let venues: Vec<VenueRecord> = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), count = venues.len(), "loaded venue fixture");
        Ok(Self::new(venues))
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

fn window<T: Clone>(rows: &[T], offset: usize, limit: usize) -> Vec<T> {
    rows.iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl VenueStore for MemoryStore {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<VenueRecord>, SyncError> {
        Ok(window(&self.venues, offset, limit))
    }

    async fn fetch_venue(&self, id: i64) -> Result<Option<VenueRecord>, SyncError> {
        Ok(self.venues.iter().find(|v| v.id == id).cloned())
    }

    async fn fetch_regions(&self) -> Result<Vec<String>, SyncError> {
        Ok(distinct_sorted(self.venues.iter().map(|v| Some(&v.county))))
    }

    async fn fetch_authorities(&self, region: &str) -> Result<Vec<String>, SyncError> {
        Ok(distinct_sorted(
            self.venues
                .iter()
                .filter(|v| v.county == region)
                .map(|v| v.local_authority.as_ref()),
        ))
    }

    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EventRecord>, SyncError> {
        Ok(window(&self.events, offset, limit))
    }
}
