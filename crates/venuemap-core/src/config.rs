//! Tunables for the map data pipeline.

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::geo::ViewportBounds;

/// Rows requested per bulk-load page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Page ceiling for one bulk load (caps the collection at 100,000 rows).
pub const DEFAULT_MAX_PAGES: usize = 100;
/// Most markers rendered for one viewport.
pub const DEFAULT_MARKER_LIMIT: usize = 1000;
/// Rows per page in the venue and event list views.
pub const LIST_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub page_size: usize,
    pub max_pages: usize,
    pub marker_limit: usize,
    pub initial_viewport: ViewportBounds,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            marker_limit: DEFAULT_MARKER_LIMIT,
            initial_viewport: ViewportBounds::default(),
        }
    }
}

impl MapConfig {
    /// Reject settings that would stall the loader or hide every marker.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("page_size", self.page_size),
            ("max_pages", self.max_pages),
            ("marker_limit", self.marker_limit),
        ] {
            if value == 0 {
                return Err(CoreError::ZeroSetting { field });
            }
        }
        let viewport = &self.initial_viewport;
        let spans_ok = [viewport.latitude_delta, viewport.longitude_delta]
            .iter()
            .all(|d| d.is_finite() && *d >= 0.0);
        if !spans_ok {
            return Err(CoreError::InvalidViewport);
        }
        Ok(())
    }

    /// Upper bound on rows a single bulk load can return.
    pub fn max_records(&self) -> usize {
        self.page_size.saturating_mul(self.max_pages)
    }
}
