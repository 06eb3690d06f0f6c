use thiserror::Error;

use crate::ledger::LedgerError;
use crate::storage::StoreError;

/// Centralized error types for the application
///
/// Layer-specific errors (`StoreError`, `LedgerError`) convert into this enum
/// at the edges where they meet Telegram or process startup.
#[derive(Error, Debug)]
pub enum AppError {
    /// Document store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Referral ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_convert() {
        let err: AppError = StoreError::Unavailable("pool closed".to_string()).into();
        assert_eq!(err.to_string(), "Storage error: Document store unavailable: pool closed");

        let err: AppError = LedgerError::Contention {
            key: "42".to_string(),
            attempts: 8,
        }
        .into();
        assert!(matches!(err, AppError::Ledger(_)));
        assert!(err.to_string().contains("after 8 conflicting attempts"));
    }

    #[test]
    fn test_telegram_error_converts() {
        let err: AppError = teloxide::RequestError::Api(teloxide::ApiError::BotBlocked).into();
        assert!(matches!(err, AppError::Telegram(_)));
        assert!(err.to_string().starts_with("Telegram error:"));
    }
}
