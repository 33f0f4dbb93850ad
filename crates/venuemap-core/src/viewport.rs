//! Viewport filtering: which venues get a map marker for a given viewport.
//!
//! Every pass is a linear scan over the full collection. There is no spatial
//! index and nothing is carried over between passes, so the cost is O(N) in
//! the collection size per viewport change.
//!
//! When more venues match than the marker limit allows, the first `limit`
//! matches in collection order are kept. The truncation order is observable
//! and must stay collection order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::{Coordinate, ViewportBounds};
use crate::venue::VenueRecord;

/// Render-only projection of a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueAnnotation {
    /// Source venue id, used to find the record again on selection.
    pub id: i64,
    pub coordinate: Coordinate,
    pub title: String,
}

impl VenueAnnotation {
    /// Project a venue, or `None` if it has no usable map position.
    pub fn from_venue(venue: &VenueRecord) -> Option<Self> {
        Some(Self {
            id: venue.id,
            coordinate: venue.coordinate()?,
            title: venue.name.clone(),
        })
    }
}

/// Result of one filter pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleMarkers {
    pub annotations: Vec<VenueAnnotation>,
    /// More venues matched than `annotations` holds.
    pub too_many_markers: bool,
    /// Venues inside the viewport before truncation.
    pub matched: usize,
}

/// Compute the capped annotation list for `bounds`.
pub fn visible_markers(
    venues: &[VenueRecord],
    bounds: &ViewportBounds,
    limit: usize,
) -> VisibleMarkers {
    let visible: Vec<&VenueRecord> = venues
        .iter()
        .filter(|venue| venue.coordinate().is_some_and(|c| bounds.contains(c)))
        .collect();

    let matched = visible.len();
    let too_many_markers = matched > limit;

    // Coordinates are parsed again here rather than carried from the scan.
    let annotations: Vec<VenueAnnotation> = visible
        .into_iter()
        .take(limit)
        .filter_map(VenueAnnotation::from_venue)
        .collect();

    debug!(
        total = venues.len(),
        matched,
        shown = annotations.len(),
        too_many_markers,
        "viewport filter pass"
    );

    VisibleMarkers {
        annotations,
        too_many_markers,
        matched,
    }
}
