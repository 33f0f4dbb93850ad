//! Venue and event rows as stored by the remote directory backend.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::{Coordinate, parse_coordinate};

/// Public object path prefix for photo references that are not absolute URLs.
const PUBLIC_STORAGE_PATH: &str = "storage/v1/object/public";

/// One row of the `Venue` table.
///
/// Coordinates are kept exactly as the backend stores them (decimal strings);
/// use [`coordinate`](Self::coordinate) to obtain a map position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRecord {
    pub id: i64,
    #[serde(default)]
    pub fsa_id: Option<i64>,
    #[serde(rename = "venuename")]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "venuetype", default)]
    pub venue_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub town: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub county: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub postcode: String,
    #[serde(default)]
    pub postalsearch: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub easting: Option<String>,
    #[serde(default)]
    pub northing: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub local_authority: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub is_live: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub created_at: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl VenueRecord {
    /// A minimal record with only the required columns populated.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            fsa_id: None,
            name: name.into(),
            slug: None,
            venue_type: None,
            address: String::new(),
            address2: None,
            town: String::new(),
            county: String::new(),
            postcode: String::new(),
            postalsearch: None,
            telephone: None,
            easting: None,
            northing: None,
            latitude: None,
            longitude: None,
            local_authority: None,
            website: None,
            photo: None,
            is_live: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder-style setter for the stored latitude/longitude strings.
    pub fn with_position(mut self, latitude: Option<&str>, longitude: Option<&str>) -> Self {
        self.latitude = latitude.map(str::to_string);
        self.longitude = longitude.map(str::to_string);
        self
    }

    /// Map position, if both coordinate strings parse as finite decimals.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let latitude = parse_coordinate(self.latitude.as_deref()?)?;
        let longitude = parse_coordinate(self.longitude.as_deref()?)?;
        Some(Coordinate::new(latitude, longitude))
    }

    /// Website, unless the backend left it blank or stored the literal `NULL`.
    pub fn website(&self) -> Option<&str> {
        self.website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty() && *w != "NULL")
    }

    /// Website as a link target; bare hosts get an `https://` scheme.
    pub fn website_url(&self) -> Option<String> {
        let website = self.website()?;
        if website.starts_with("http") {
            Some(website.to_string())
        } else {
            Some(format!("https://{website}"))
        }
    }

    /// Resolve the photo reference to a fetchable URL.
    ///
    /// Absolute `http(s)` references are returned as-is; anything else is a
    /// path inside the backend's public object storage under `base_url`.
    pub fn photo_url(&self, base_url: &str) -> Option<String> {
        let photo = self
            .photo
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "NULL")?;
        if photo.starts_with("http") {
            return Some(photo.to_string());
        }
        Some(format!(
            "{}/{PUBLIC_STORAGE_PATH}/{}",
            base_url.trim_end_matches('/'),
            photo.trim_start_matches('/')
        ))
    }

    /// `town, county, postcode` as shown under the address in list rows.
    pub fn locality(&self) -> String {
        format!("{}, {}, {}", self.town, self.county, self.postcode)
    }
}

impl PartialEq for VenueRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VenueRecord {}

impl Hash for VenueRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One row of the `Event` table with its venue embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    #[serde(rename = "event_title")]
    pub title: String,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub event_start: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "listingId", default)]
    pub listing_id: Option<i64>,
    #[serde(default)]
    pub venue: Option<VenueRecord>,
}

/// Some legacy rows carry `null` in text columns the schema treats as required.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
