/*
[INPUT]:  Error sources (wallet prompts, HTTP, API, indexer, serialization, state machine)
[OUTPUT]: Structured error types with user-facing codes and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::state_machine::{ConnectionEvent, ConnectionState};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the Littlefish wallet adapter
#[derive(Error, Debug)]
pub enum WalletError {
    /// The requested wallet is not installed or not registered
    #[error("Wallet '{name}' is not available")]
    WalletUnavailable { name: String },

    /// A wallet operation was attempted before a wallet was enabled
    #[error("No wallet connected")]
    NotConnected,

    /// The user declined the wallet's permission prompt
    #[error("Wallet '{name}' connection was rejected by the user")]
    UserRejected { name: String },

    /// The user declined the signing prompt
    #[error("Signature request was declined")]
    SignatureDeclined,

    /// The wallet prompt did not complete in time
    #[error("Wallet prompt timed out after {duration}s")]
    PromptTimeout { duration: u64 },

    /// The caller cancelled an in-flight operation
    #[error("Operation cancelled")]
    Cancelled,

    /// A signature failed CIP-8 verification
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// An address could not be decoded
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The server rejected the request because no session is active
    #[error("Authentication required")]
    Unauthorized,

    /// The server rejected the payload with field-level errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// The blockchain indexer could not be reached or returned an error
    #[error("Indexer unavailable: {0}")]
    IndexerUnavailable(String),

    /// The server is missing required configuration (e.g. indexer key)
    #[error("Service misconfigured: {0}")]
    ServiceMisconfigured(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection lifecycle transition not allowed from the current state
    #[error("Invalid transition: {from:?} -> {event:?}")]
    InvalidTransition {
        from: ConnectionState,
        event: ConnectionEvent,
    },
}

impl WalletError {
    /// Check if the error is worth a manual retry by the user
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::Http(_)
                | WalletError::PromptTimeout { .. }
                | WalletError::IndexerUnavailable(_)
                | WalletError::SignatureDeclined
                | WalletError::UserRejected { .. }
        )
    }

    /// Check if error indicates an authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            WalletError::Unauthorized | WalletError::InvalidSignature(_)
        )
    }

    /// Check if the failure should be shown to the user as its own message
    /// rather than logged as an internal fault
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            WalletError::WalletUnavailable { .. }
                | WalletError::NotConnected
                | WalletError::UserRejected { .. }
                | WalletError::SignatureDeclined
                | WalletError::PromptTimeout { .. }
                | WalletError::InvalidSignature(_)
                | WalletError::InvalidAddress(_)
                | WalletError::Unauthorized
                | WalletError::Validation { .. }
        )
    }

    /// Stable code shown to users so each failure renders its own message
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::WalletUnavailable { .. } => "WALLET_UNAVAILABLE",
            WalletError::NotConnected => "NOT_CONNECTED",
            WalletError::UserRejected { .. } => "USER_REJECTED",
            WalletError::SignatureDeclined => "SIGNATURE_DECLINED",
            WalletError::PromptTimeout { .. } => "PROMPT_TIMEOUT",
            WalletError::Cancelled => "CANCELLED",
            WalletError::InvalidSignature(_) => "INVALID_SIGNATURE",
            WalletError::InvalidAddress(_) => "INVALID_ADDRESS",
            WalletError::Unauthorized => "UNAUTHORIZED",
            WalletError::Validation { .. } => "VALIDATION_ERROR",
            WalletError::IndexerUnavailable(_) => "INDEXER_UNAVAILABLE",
            WalletError::ServiceMisconfigured(_) => "SERVICE_MISCONFIGURED",
            WalletError::NotFound(_) => "NOT_FOUND",
            WalletError::Http(_) => "HTTP_ERROR",
            WalletError::Api { .. } => "API_ERROR",
            WalletError::Serialization(_) => "SERIALIZATION_ERROR",
            WalletError::UrlParse(_) => "INVALID_URL",
            WalletError::Config(_) => "CONFIG_ERROR",
            WalletError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        WalletError::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Result type alias for wallet adapter operations
pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let timeout_err = WalletError::PromptTimeout { duration: 120 };
        assert!(timeout_err.is_retryable());

        let auth_err = WalletError::Unauthorized;
        assert!(!auth_err.is_retryable());
        assert!(!WalletError::NotConnected.is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        assert!(WalletError::Unauthorized.is_auth_error());
        assert!(WalletError::InvalidSignature("bad".into()).is_auth_error());
        assert!(!WalletError::SignatureDeclined.is_auth_error());
    }

    #[test]
    fn test_user_facing_errors() {
        assert!(WalletError::SignatureDeclined.is_user_facing());
        assert!(WalletError::NotConnected.is_user_facing());
        assert!(!WalletError::Config("bad".into()).is_user_facing());
        assert!(!WalletError::IndexerUnavailable("down".into()).is_user_facing());
    }

    #[test]
    fn test_distinct_codes_for_user_facing_failures() {
        let codes = [
            WalletError::WalletUnavailable { name: "Nami".into() }.code(),
            WalletError::UserRejected { name: "Nami".into() }.code(),
            WalletError::SignatureDeclined.code(),
            WalletError::InvalidSignature("x".into()).code(),
            WalletError::Unauthorized.code(),
            WalletError::Validation {
                message: "bad".into(),
                errors: vec![],
            }
            .code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_api_error_creation() {
        let err = WalletError::api_error(StatusCode::BAD_GATEWAY, "upstream");
        match err {
            WalletError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            _ => panic!("Expected Api error variant"),
        }
    }
}
