use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The cancellation token fired. Kept distinct from every other
    /// failure so callers stop immediately instead of treating it as a
    /// miss.
    #[error("search cancelled")]
    Cancelled,

    #[error("HTTP client initialization failed: {0}")]
    Init(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
