//! Paged bulk loading of the full venue table.
//!
//! The backend caps rows per response, so the loader walks fixed-size pages
//! from offset 0 until a short page comes back or the page ceiling is hit.
//! Progress is reported as `pages_fetched / max_pages`. That is an
//! approximation (the true row count is never requested), and callers set
//! it to 1.0 themselves once a load completes.

use tracing::{debug, info};
use venuemap_core::{MapConfig, VenueRecord};

use crate::{SyncError, VenueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkLoader {
    page_size: usize,
    max_pages: usize,
}

impl BulkLoader {
    pub fn new(page_size: usize, max_pages: usize) -> Self {
        Self {
            page_size,
            max_pages,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.page_size, config.max_pages)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch every venue, up to `page_size * max_pages` rows.
    ///
    /// `on_progress` is called once after each page with the fraction of the
    /// page ceiling consumed so far. Any fetch or decode error aborts the walk
    /// and discards the rows accumulated so far.
    pub async fn load_all<S, F>(&self, store: &S, mut on_progress: F) -> Result<Vec<VenueRecord>, SyncError>
    where
        S: VenueStore + ?Sized,
        F: FnMut(f64),
    {
        info!(
            page_size = self.page_size,
            max_pages = self.max_pages,
            "starting bulk venue load"
        );

        let mut venues: Vec<VenueRecord> = Vec::new();
        for page in 0..self.max_pages {
            let offset = page * self.page_size;
            let rows = store.fetch_page(offset, self.page_size).await?;
            let fetched = rows.len();
            venues.extend(rows);

            on_progress((page + 1) as f64 / self.max_pages as f64);
            debug!(page, offset, fetched, total = venues.len(), "fetched venue page");

            if fetched < self.page_size {
                break;
            }
        }

        info!(count = venues.len(), "bulk venue load complete");
        Ok(venues)
    }
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}
