use thiserror::Error;

/// Errors raised by the prediction core.
///
/// Missing data (no snapshot, no odds for a market) is never an error here;
/// those paths return a skip outcome instead.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid expected-goals rate {0}: must be finite and non-negative")]
    InvalidRate(f64),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON encode/decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt stored record: {0}")]
    Corrupt(String),

    #[error("Snapshot store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, PredictError>;
