use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages.
pub mod msg {
    pub const SESSION_ID_REQUIRED: &str = "Session ID is required";
    pub const PAYMENT_NOT_COMPLETED: &str = "Payment not completed";
    pub const DOWNLOAD_LINK_FAILED: &str = "Failed to generate download link";
    pub const MISSING_USER_ID: &str = "Missing user ID";
    pub const MISSING_ANIMATION_ID: &str = "Missing animation ID";
    pub const MISSING_ANIMATION_IDS: &str = "Missing animation IDs";
    pub const MISSING_SIGNATURE_HEADER: &str = "Missing stripe-signature header";
    pub const INVALID_SIGNATURE_HEADER: &str = "Invalid signature header";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature";
    pub const SIGNATURE_MISMATCH: &str =
        "No signatures found matching the expected signature for payload";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const INVALID_EVENT: &str = "Invalid event payload";
    pub const INVALID_CHECKOUT_SESSION: &str = "Invalid checkout session";
    pub const METADATA_TOO_LONG: &str = "Too many items in cart for a single checkout";
    pub const ANIMATION_ID_TOO_LONG: &str = "Animation ID is too long";
    pub const ANIMATION_TITLE_TOO_LONG: &str = "Animation title is too long";
    pub const PURCHASE_RECORD_FAILED: &str = "Failed to record purchase";
    pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Webhook signature rejected: {0}")]
    InvalidSignature(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::InvalidSignature(_)
            | AppError::Upstream(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Persistence(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<crate::models::MetadataError> for AppError {
    fn from(error: crate::models::MetadataError) -> Self {
        use crate::models::MetadataError;
        use crate::models::metadata::{KEY_ANIMATION_ID, KEY_ANIMATION_TITLE};
        let message = match error {
            MetadataError::MissingAnimationId => msg::MISSING_ANIMATION_ID,
            MetadataError::MissingAnimationIds => msg::MISSING_ANIMATION_IDS,
            MetadataError::ValueTooLong(KEY_ANIMATION_ID) => msg::ANIMATION_ID_TOO_LONG,
            MetadataError::ValueTooLong(KEY_ANIMATION_TITLE) => msg::ANIMATION_TITLE_TOO_LONG,
            MetadataError::ValueTooLong(_) => msg::METADATA_TOO_LONG,
        };
        AppError::BadRequest(message.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Upstream(msg) => {
                msg.clone()
            }
            AppError::InvalidSignature(msg) => format!("Webhook Error: {}", msg),
            AppError::MethodNotAllowed => msg::METHOD_NOT_ALLOWED.to_string(),
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {}", msg);
                msg.clone()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Convert a missing value into a client-facing error.
pub trait OptionExt<T> {
    fn or_bad_request(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_bad_request(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::BadRequest(message.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
