use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use model::{catalog::ListingValidationError, orders::CartItemError, provisioning::ProvisionError};
use sea_orm::DbErr;
use tracing::error;

use crate::policy::Denial;
use crate::schemas::ErrorResponse;

/// Boundary translator: every failure a handler can produce funnels through
/// this type, which owns the status code and the wire body. Database errors
/// log server-side and surface as an opaque 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },
    #[error("{0}")]
    NotAuthenticated(String),
    #[error("{0}")]
    InvalidToken(String),
    #[error("{message}")]
    PermissionDenied { code: &'static str, message: String },
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::Internal(err.into())
    }
}

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { code, message: message.into() }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::PermissionDenied { code, message: message.into() }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { code, message: message.into() }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated(_) | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. }
            | Self::PermissionDenied { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. } => code,
            Self::NotAuthenticated(_) => "NOT_AUTHENTICATED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref cause) = self {
            // Cause detail stays in the log, never in the body.
            error!("Internal error while handling request: {:#}", cause);
        }

        let status = self.status();
        let body = ErrorResponse {
            status_code: status.as_u16(),
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        let message = err.to_string();
        match err {
            ProvisionError::EmailRequired => Self::Validation { code: "EMAIL_REQUIRED", message },
            ProvisionError::PasswordRequired => {
                Self::Validation { code: "PASSWORD_REQUIRED", message }
            }
            ProvisionError::EmailTaken => Self::Conflict { code: "DUPLICATE_EMAIL", message },
            ProvisionError::Db(db_error) => Self::Internal(db_error.into()),
        }
    }
}

impl From<ListingValidationError> for ApiError {
    fn from(err: ListingValidationError) -> Self {
        Self::Validation { code: err.code(), message: err.to_string() }
    }
}

impl From<CartItemError> for ApiError {
    fn from(err: CartItemError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            CartItemError::CartNotFound | CartItemError::ListingNotFound => {
                Self::NotFound { code, message }
            }
            CartItemError::DuplicateCartItem => Self::Conflict { code, message },
            CartItemError::ListingInactive
            | CartItemError::QuantityTooSmall
            | CartItemError::QuantityExceedsStock => Self::Validation { code, message },
            CartItemError::Db(db_error) => Self::Internal(db_error.into()),
        }
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        Self::PermissionDenied { code: denial.code(), message: denial.to_string() }
    }
}
