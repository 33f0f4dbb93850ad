//! Administrative region helpers: the county/authority predicate applied to
//! the held venue collection, and catalogue normalisation for region pickers.

use std::collections::BTreeSet;

use crate::venue::VenueRecord;

/// Client-side narrowing of a venue collection by county and local authority.
///
/// Both parts are exact string matches. An empty string is treated the same
/// as `None`; an authority without a region is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    pub region: Option<String>,
    pub authority: Option<String>,
}

impl RegionFilter {
    pub fn new(region: Option<String>, authority: Option<String>) -> Self {
        Self { region, authority }
    }

    /// The filter keeps every venue.
    pub fn is_noop(&self) -> bool {
        non_empty(self.region.as_deref()).is_none()
    }

    pub fn matches(&self, venue: &VenueRecord) -> bool {
        let Some(region) = non_empty(self.region.as_deref()) else {
            return true;
        };
        if venue.county != region {
            return false;
        }
        match non_empty(self.authority.as_deref()) {
            Some(authority) => venue.local_authority.as_deref() == Some(authority),
            None => true,
        }
    }

    /// Keep the matching venues, preserving order.
    pub fn apply(&self, venues: &[VenueRecord]) -> Vec<VenueRecord> {
        if self.is_noop() {
            return venues.to_vec();
        }
        venues.iter().filter(|v| self.matches(v)).cloned().collect()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Normalise raw region or authority names for a picker: trim, drop blanks,
/// de-duplicate, sort ascending.
pub fn distinct_sorted<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .flatten()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
