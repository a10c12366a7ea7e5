use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("Token not found: {0}")] TokenNotFound(String),

    #[error("Price unavailable: {0}")] PriceUnavailable(String),

    #[error("Market data provider rate limited")]
    RateLimited,

    #[error("Notification error: {0}")] Notification(String),

    #[error("Block fetch error: {0}")] BlockFetch(String),

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid network: {0}")] InvalidNetwork(String),

    #[error("Invalid amount: {0}")] InvalidAmount(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

impl AppError {
    /// Whether a bounded retry makes sense for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RateLimited)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
