//! Supabase store clients for the order intake pipeline.
//!
//! # Architecture
//!
//! The same logical store is reached through two differently privileged
//! handles, and the privilege level is part of the type:
//!
//! - [`UserStore`] acts *as the authenticated caller*: every request carries
//!   the public anon key plus the caller's own bearer token, so row-level
//!   security applies exactly as it would for a direct client call. Used for
//!   identity verification and both order inserts.
//! - [`ServiceStore`] carries the trusted service-role key and is only used
//!   for the privileged aggregate RPC. It is never handed a caller token.
//!
//! Both handles are constructed per invocation from [`SupabaseConfig`];
//! nothing privileged lives in ambient state.
//!
//! [`SupabaseConfig`]: crate::config::SupabaseConfig

mod service;
mod user;

pub use service::{ServiceStore, TotalRow};
pub use user::{AuthUser, UserStore};

use thiserror::Error;

/// Errors that can occur when talking to the Supabase REST and auth APIs.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An insert that must return exactly one row returned a different count.
    #[error("expected a single row, got {0}")]
    RowCount(usize),

    /// A credential could not be encoded as an HTTP header.
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// Read the response body and surface non-success statuses as [`StoreError::Api`].
///
/// Returns the raw body text on success so callers can parse it with better
/// diagnostics than `Response::json` allows.
pub(crate) async fn read_success_body(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if !status.is_success() {
        tracing::debug!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Supabase API returned non-success status"
        );
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: text,
        });
    }

    Ok(text)
}
