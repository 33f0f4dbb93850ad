//! Map controller: a single-owner task that holds the venue collection and
//! publishes marker state for the current viewport.

mod controller;
mod error;
mod state;

pub use controller::{MapController, MapHandle};
pub use error::MapError;
pub use state::MapState;
