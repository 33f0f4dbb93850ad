use thiserror::Error;
use venuemap_core::CoreError;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map controller has shut down")]
    Closed,

    #[error(transparent)]
    Config(#[from] CoreError),
}
