pub mod config;
mod error;
pub mod geo;
pub mod region;
pub mod schema;
pub mod venue;
pub mod viewport;

pub use config::MapConfig;
pub use error::CoreError;
pub use geo::{Coordinate, ViewportBounds};
pub use region::RegionFilter;
pub use schema::tables;
pub use venue::{EventRecord, VenueRecord};
pub use viewport::{VenueAnnotation, VisibleMarkers, visible_markers};
