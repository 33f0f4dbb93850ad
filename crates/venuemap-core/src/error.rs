use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {field} must be greater than zero")]
    ZeroSetting { field: &'static str },

    #[error("invalid configuration: viewport span must be finite and non-negative")]
    InvalidViewport,

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
