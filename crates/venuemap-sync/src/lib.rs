//! Sync layer: paged bulk loading from the venue backend, PostgREST HTTP transport, in-memory fixtures.

mod error;
pub mod loader;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use error::SyncError;
pub use loader::BulkLoader;
pub use store::{MemoryStore, VenueStore};

#[cfg(feature = "http")]
pub use http::RestClient;
