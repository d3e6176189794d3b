use thiserror::Error;

/// Result alias used across the canvas core.
pub type PlaceResult<T> = Result<T, PlaceError>;

/// Failures surfaced by placement, reads and canvas repair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceError {
    /// A request field is missing, malformed or out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The author placed a square less than the cooldown ago.
    #[error("too many requests, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// The square store or placement log rejected an operation.
    #[error("store error: {0}")]
    Store(String),

    /// The canvas cache rejected an operation.
    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlaceError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        PlaceError::InvalidInput(msg.into())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        PlaceError::Store(err.to_string())
    }

    pub fn cache<E: std::fmt::Display>(err: E) -> Self {
        PlaceError::Cache(err.to_string())
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for PlaceError {
    fn from(err: mongodb::error::Error) -> Self {
        PlaceError::Store(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for PlaceError {
    fn from(err: redis::RedisError) -> Self {
        PlaceError::Cache(err.to_string())
    }
}
