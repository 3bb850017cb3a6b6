use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile and discovery errors
/// - E3xxx: Moderation errors
/// - E4xxx: Notification errors
/// - E5xxx: Review errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Timeout,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Profile / discovery (E2xxx)
    ProfileNotFound,
    NavigatorNotFound,
    FilterNotFound,
    ProfileDeleted,
    ProfileSuspended,

    // Moderation (E3xxx)
    LikeNotFound,
    BlockNotFound,
    CannotTargetSelf,
    ProfileBlocked,
    ModerationStepFailed,

    // Notification (E4xxx)
    ChatDeliveryFailed,

    // Reviews (E5xxx)
    ReviewNotFound,
    ReviewNotOwned,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Timeout => "E0008",

            // Auth
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",

            // Profile / discovery
            Self::ProfileNotFound => "E2001",
            Self::NavigatorNotFound => "E2002",
            Self::FilterNotFound => "E2003",
            Self::ProfileDeleted => "E2004",
            Self::ProfileSuspended => "E2005",

            // Moderation
            Self::LikeNotFound => "E3001",
            Self::BlockNotFound => "E3002",
            Self::CannotTargetSelf => "E3003",
            Self::ProfileBlocked => "E3004",
            Self::ModerationStepFailed => "E3005",

            // Notification
            Self::ChatDeliveryFailed => "E4001",

            // Reviews
            Self::ReviewNotFound => "E5001",
            Self::ReviewNotOwned => "E5002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ModerationStepFailed | Self::ChatDeliveryFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::NavigatorNotFound | Self::FilterNotFound
            | Self::LikeNotFound | Self::BlockNotFound | Self::ReviewNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::CannotTargetSelf | Self::ReviewNotOwned => StatusCode::FORBIDDEN,
            Self::ProfileDeleted | Self::ProfileSuspended | Self::ProfileBlocked => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Validation failure tied to a single request field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::with_details(
            ErrorCode::ValidationError,
            message,
            serde_json::json!({ "field": field }),
        )
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        Self::with_details(ErrorCode::ValidationError, errors.to_string(), details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = code.status_code();

        let body = match self {
            AppError::Known { message, details, .. } => {
                if status.is_server_error() {
                    tracing::error!(code = code.code(), error = %message, "request failed");
                }
                ApiErrorResponse::new(code.code(), message, details)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                ApiErrorResponse::new(code.code(), "internal server error", None)
            }
            AppError::Database(diesel::result::Error::NotFound) => {
                ApiErrorResponse::new(code.code(), "resource not found", None)
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                ApiErrorResponse::new(code.code(), "database error", None)
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// ─── Tests ───
