use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use venuemap_core::{VenueAnnotation, VenueRecord, ViewportBounds};

/// Snapshot of everything the map view renders.
///
/// Published as a whole on every change, so the annotation list, the
/// too-many-markers flag and the viewport they were computed for are always
/// observed together.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    /// The held venue collection (after any region filter).
    pub venues: Arc<Vec<VenueRecord>>,
    pub annotations: Arc<Vec<VenueAnnotation>>,
    pub too_many_markers: bool,
    pub viewport: ViewportBounds,
    /// Fraction of the page ceiling fetched so far; 1.0 once a load completes.
    pub loading_progress: f64,
    pub is_loading: bool,
    pub last_error: Option<String>,
    /// Bulk loads finished so far, successful or not.
    pub loads_completed: u64,
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub selected: Option<VenueRecord>,
    pub regions: Vec<String>,
    pub authorities_by_region: BTreeMap<String, Vec<String>>,
}

impl MapState {
    pub(crate) fn new(viewport: ViewportBounds) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Annotation for the selected venue, if it is currently on the map.
    pub fn selected_annotation(&self) -> Option<&VenueAnnotation> {
        let id = self.selected.as_ref()?.id;
        self.annotations.iter().find(|a| a.id == id)
    }
}
