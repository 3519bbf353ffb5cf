/*
[INPUT]:  Handler failures (store, challenge, verification, indexer)
[OUTPUT]: JSON error responses `{message, code, errors?}` with matching status
[POS]:    HTTP layer - error to response mapping
[UPDATE]: When adding error codes or changing status mapping
*/

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use littlefish_adapter::auth::VerifyError;
use littlefish_adapter::{ErrorBody, FieldError, WalletError};
use tracing::error;

use crate::challenge::ChallengeError;
use crate::state::StoreError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    errors: Vec<FieldError>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication required",
        )
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Invalid username or password",
        )
    }

    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        }
    }

    pub fn invalid_signature() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_SIGNATURE",
            "Signature verification failed",
        )
    }

    pub fn wallet_in_use() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "WALLET_IN_USE",
            "This wallet is already linked to another account",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            message,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
                code: Some(self.code.to_string()),
                errors: self.errors,
            }),
        )
            .into_response()
    }
}

impl From<ChallengeError> for ApiError {
    fn from(err: ChallengeError) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "CHALLENGE_REJECTED",
            format!("Challenge rejected: {err}"),
        )
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Address(reason) => Self::validation(
                "Invalid address",
                vec![FieldError::new("address", reason)],
            ),
            _ => Self::invalid_signature(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => {
                Self::new(StatusCode::CONFLICT, "USERNAME_TAKEN", err.to_string())
            }
            StoreError::WalletInUse => Self::wallet_in_use(),
            StoreError::NotFound(_) => Self::unauthorized(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Validation { message, errors } => Self::validation(message, errors),
            WalletError::InvalidAddress(reason) => Self::validation(
                "Invalid address",
                vec![FieldError::new("address", reason)],
            ),
            WalletError::ServiceMisconfigured(message) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_MISCONFIGURED",
                message,
            ),
            WalletError::IndexerUnavailable(message) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "INDEXER_UNAVAILABLE",
                message,
            ),
            WalletError::Http(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "INDEXER_UNAVAILABLE",
                "Indexer unreachable",
            ),
            WalletError::NotFound(message) => Self::not_found(message),
            WalletError::InvalidSignature(_) => Self::invalid_signature(),
            WalletError::Unauthorized => Self::unauthorized(),
            other => Self::internal(other.to_string()),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
