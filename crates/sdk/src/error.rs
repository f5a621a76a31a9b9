use luckyfive_model::{RateLimited, ValidationError};

/// Error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Validation error.
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    /// Rate limit exceeded.
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(#[from] RateLimited),
    /// Payment verification failed.
    #[error("payment verification failed: {0}")]
    PaymentVerificationFailed(String),
    /// The cycle of the running game has expired.
    #[error("cycle {0} expired during the game")]
    CycleExpiredMidGame(u64),
    /// Player not found.
    #[error("player not found: {0}")]
    PlayerNotFound(String),
    /// No game in progress.
    #[error("no game in progress")]
    GameNotStarted,
    /// Too many conflicting writers.
    #[error("contention: {0}")]
    Contention(String),
    /// Store error.
    #[error("store: {0}")]
    Store(String),
    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Time error.
    #[error("time: {0}")]
    Time(#[from] time::error::ComponentRange),
    /// Reqwest error.
    #[cfg(http_store)]
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Parse url error.
    #[cfg(http_store)]
    #[error("parse url: {0}")]
    ParseUrl(#[from] url::ParseError),
    /// Custom error.
    #[error("custom: {0}")]
    Custom(String),
}

impl Error {
    /// Create a custom error.
    pub fn custom(msg: impl ToString) -> Self {
        Self::Custom(msg.to_string())
    }

    /// Create a store error.
    pub fn store(msg: impl ToString) -> Self {
        Self::Store(msg.to_string())
    }

    /// Returns whether this is a rate limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded(_))
    }
}
