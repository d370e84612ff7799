//! Unified error handling with Sentry integration.
//!
//! Every failure exit of the intake pipeline has its own `AppError` variant.
//! The `Display` string of a variant is the exact message returned to the
//! client, so handlers never build response bodies by hand. Server-side
//! failures are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::supabase::StoreError;

/// Application-level error type for the intake service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request used a method other than POST or OPTIONS.
    #[error("Method not allowed, use POST")]
    MethodNotAllowed,

    /// Authorization header absent or not a bearer credential.
    #[error("Missing Authorization: Bearer <access_token>")]
    MissingBearer,

    /// The identity provider rejected the access token.
    #[error("Invalid or expired token")]
    InvalidToken(#[source] StoreError),

    /// Request body did not parse as JSON, or did not match the order schema.
    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),

    /// Required order fields absent or empty.
    #[error("Missing required fields: recipient_name, shipping_address")]
    MissingFields,

    /// `items` missing, not an array, or empty.
    #[error("Order must contain at least one item")]
    EmptyItems,

    /// The order header insert failed.
    #[error("Failed to insert order")]
    OrderInsert(#[source] StoreError),

    /// The line-item insert failed. The order header is already persisted.
    #[error("Failed to insert order items")]
    ItemsInsert(#[source] StoreError),

    /// The privileged aggregate call failed. The order and its items are
    /// already persisted, which the message makes explicit.
    #[error("Order created, but failed to calculate totals for other orders")]
    AggregateCall(#[source] StoreError),
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingBearer | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidJson(_) | Self::MissingFields | Self::EmptyItems => {
                StatusCode::BAD_REQUEST
            }
            Self::OrderInsert(_) | Self::ItemsInsert(_) | Self::AggregateCall(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            // Operators need the underlying store error, the client does not
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                source = ?std::error::Error::source(&self),
                sentry_event_id = %event_id,
                "Order intake request failed"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Order intake request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
