/// Error Handling Module
///
/// One error type for the whole service, split into domain-specific kinds:
/// 1. Validation errors (malformed input)
/// 2. Storage errors (backend unavailable or rejecting a write)
/// 3. Authentication errors (collapsed into a few client-visible kinds)
/// 4. Configuration errors (fatal at startup)
///
/// Security-relevant detail (why a refresh was rejected, what the database
/// said) is kept in the error value for logging and never rendered to clients.

use actix_web::{error::ResponseError, http::StatusCode, HttpRequest, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} should not be empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            ValidationError::InvalidFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Storage backend errors
#[derive(Debug)]
pub enum StorageError {
    /// Backend could not be reached (pool exhausted, connection refused).
    Unavailable(String),
    /// Unique constraint violated.
    Conflict(String),
    Query(String),
    /// A stored row could not be mapped back into a domain value.
    Corrupt(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StorageError::Conflict(msg) => write!(f, "Duplicate entry: {}", msg),
            StorageError::Query(msg) => write!(f, "Query error: {}", msg),
            StorageError::Corrupt(msg) => write!(f, "Corrupt record: {}", msg),
        }
    }
}

impl StdError for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StorageError::Conflict(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::Corrupt(err.to_string())
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Why a refresh token was rejected. Logged, never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRejection {
    MissingToken,
    Malformed,
    BadSignature,
    Expired,
    UnknownUser,
    InactiveUser,
    NoMatchingSession,
    AlreadyRotated,
}

impl RefreshRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshRejection::MissingToken => "missing_token",
            RefreshRejection::Malformed => "malformed",
            RefreshRejection::BadSignature => "bad_signature",
            RefreshRejection::Expired => "expired",
            RefreshRejection::UnknownUser => "unknown_user",
            RefreshRejection::InactiveUser => "inactive_user",
            RefreshRejection::NoMatchingSession => "no_matching_session",
            RefreshRejection::AlreadyRotated => "already_rotated",
        }
    }
}

/// Why an access token was rejected. Logged, never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRejection {
    MissingToken,
    Invalid,
    Expired,
}

impl AccessRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRejection::MissingToken => "missing_token",
            AccessRejection::Invalid => "invalid",
            AccessRejection::Expired => "expired",
        }
    }
}

/// Authentication and authorization errors
#[derive(Debug)]
pub enum AuthError {
    /// Unknown username, wrong password and inactive account all end up here.
    InvalidCredentials,
    InvalidRefreshToken(RefreshRejection),
    Unauthorized(AccessRejection),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::InvalidRefreshToken(_) => write!(f, "Invalid refresh token"),
            AuthError::Unauthorized(_) => write!(f, "Unauthorized"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Storage(StorageError),
    Auth(AuthError),
    Config(ConfigError),
    NotFound(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::NotFound(what) => write!(f, "{} not found", what),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    /// Shorthand for the single client-visible refresh failure.
    pub fn refresh_rejected(reason: RefreshRejection) -> Self {
        AppError::Auth(AuthError::InvalidRefreshToken(reason))
    }

    pub fn unauthorized(reason: AccessRejection) -> Self {
        AppError::Auth(AuthError::Unauthorized(reason))
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Storage(StorageError::Query(format!("Migration failed: {}", err)))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// Unique error ID for correlating with server logs
    pub error_id: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            success: false,
            status_code: status,
            message,
            code,
            error_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    e.to_string(),
                ),
                AuthError::InvalidRefreshToken(_) => (
                    StatusCode::FORBIDDEN,
                    "INVALID_REFRESH_TOKEN",
                    e.to_string(),
                ),
                AuthError::Unauthorized(_) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
                }
            },

            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),

            // Storage internals never reach the client
            AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Storage(e) => {
                tracing::error!(request_id = request_id, error = %e, "Storage error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(AuthError::InvalidRefreshToken(reason)) => {
                tracing::warn!(
                    request_id = request_id,
                    reason = reason.as_str(),
                    "Refresh token rejected"
                );
            }
            AppError::Auth(AuthError::Unauthorized(reason)) => {
                tracing::warn!(
                    request_id = request_id,
                    reason = reason.as_str(),
                    "Access token rejected"
                );
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::NotFound(what) => {
                tracing::info!(request_id = request_id, resource = %what, "Resource not found");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl AppError {
    /// Log once and render the error body under `request_id`.
    pub fn to_http_response(&self, request_id: &str) -> HttpResponse {
        self.log_error(request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, request_id);

        HttpResponse::build(status).json(error_response)
    }
}

/// Fallback for errors rendered without a request at hand; gets a fresh id.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response(&uuid::Uuid::new_v4().to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::InvalidRefreshToken(_)) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context carried into log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    /// Context tagged with the id `LoggerMiddleware` assigned to `req`.
    pub fn for_request(req: &HttpRequest, operation: impl Into<String>) -> Self {
        Self {
            request_id: crate::logger::request_id(req),
            ..Self::new(operation)
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach this context to a failure so its response carries our request id.
    pub fn reject(&self, error: impl Into<AppError>) -> RequestError {
        RequestError {
            context: self.clone(),
            error: error.into(),
        }
    }
}

/// An `AppError` raised while serving a known request
#[derive(Debug)]
pub struct RequestError {
    pub context: ErrorContext,
    pub error: AppError,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context.operation, self.error)
    }
}

impl StdError for RequestError {}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        tracing::debug!(
            request_id = %self.context.request_id,
            operation = %self.context.operation,
            user_id = ?self.context.user_id,
            "Operation did not complete"
        );
        self.error.to_http_response(&self.context.request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::TooShort("password".to_string(), 8);
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }

    #[test]
    fn test_refresh_rejections_render_identically() {
        let expired = AppError::refresh_rejected(RefreshRejection::Expired);
        let forged = AppError::refresh_rejected(RefreshRejection::BadSignature);
        let replayed = AppError::refresh_rejected(RefreshRejection::NoMatchingSession);

        let (s1, b1) = ErrorHandler::error_response(&expired, "id");
        let (s2, b2) = ErrorHandler::error_response(&forged, "id");
        let (s3, b3) = ErrorHandler::error_response(&replayed, "id");

        assert_eq!(s1, StatusCode::FORBIDDEN);
        assert_eq!(s1, s2);
        assert_eq!(s2, s3);
        assert_eq!(b1.message, "Invalid refresh token");
        assert_eq!(b1.message, b2.message);
        assert_eq!(b2.message, b3.message);
        assert_eq!(b1.code, b3.code);
    }

    #[test]
    fn test_storage_error_is_opaque() {
        let err = AppError::Storage(StorageError::Query(
            "relation \"user_sessions\" does not exist".to_string(),
        ));
        let (status, body) = ErrorHandler::error_response(&err, "id");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("user_sessions"));
    }

    #[test]
    fn test_invalid_credentials_response() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        let (status, body) = ErrorHandler::error_response(&err, "req-1");

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.status_code, 401);
        assert_eq!(body.message, "Invalid credentials");
        assert_eq!(body.error_id, "req-1");
        assert!(!body.success);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("token_refresh");
        assert_eq!(ctx.operation, "token_refresh");
        assert!(ctx.user_id.is_none());

        let ctx = ctx.with_user_id("user-123".to_string());
        assert_eq!(ctx.user_id, Some("user-123".to_string()));
    }

    #[tokio::test]
    async fn test_request_error_uses_context_request_id() {
        let mut ctx = ErrorContext::new("user_login");
        ctx.request_id = "req-7".to_string();

        let err = ctx.reject(AuthError::InvalidCredentials);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let response = ResponseError::error_response(&err);
        let bytes = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error_id"], "req-7");
        assert_eq!(body["message"], "Invalid credentials");
    }
}
