/// Unified error types for the Sentira backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication and authorization failures.
///
/// `Unauthenticated` and `AccountNotFound` are rendered identically to the
/// client so responses never reveal whether an account exists.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient privileges")]
    Forbidden,

    #[error("account not found")]
    AccountNotFound,
}

/// Field-encryption failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext was tampered with or produced under a different key.
    #[error("decryption failed: ciphertext invalid or wrong key")]
    DecryptFailed,

    #[error("encryption key must be 32 bytes, url-safe base64 encoded")]
    InvalidKey,

    #[error("encryption failed")]
    EncryptFailed,
}

/// Startup configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required secret: {0}")]
    MissingSecret(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures talking to the model or agent service.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream service unreachable")]
    Unreachable,

    #[error("upstream returned an invalid response: {0}")]
    BadResponse(String),
}

/// Main error type for the backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication / authorization errors
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Field encryption errors
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream service errors
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g. duplicate email at registration)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            // Both branches produce the same body: a 401 must not reveal
            // whether the token was bad or the account missing.
            ApiError::Auth(AuthError::Unauthenticated)
            | ApiError::Auth(AuthError::AccountNotFound) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                "Invalid authentication".to_string(),
            ),
            ApiError::Auth(AuthError::Forbidden) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                "Insufficient privileges".to_string(),
            ),
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            ApiError::Upstream(UpstreamError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "UpstreamTimeout",
                self.to_string(),
            ),
            ApiError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamError",
                self.to_string(),
            ),
            // A decrypt failure means data corruption or a key mismatch.
            // Surface as a server error; details stay in the logs.
            ApiError::Crypto(_) => {
                tracing::error!("field encryption error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Database(_)
            | ApiError::Config(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => {
                tracing::error!("internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for backend operations
pub type ApiResult<T> = Result<T, ApiError>;
