//! HTTP route handlers for the intake service.
//!
//! # Route Structure
//!
//! ```text
//! GET     /health   - Liveness check
//! OPTIONS /orders   - CORS preflight (200 "ok")
//! POST    /orders   - Create an order
//! *       /orders   - 405 with a JSON error body
//! ```

pub mod orders;

use axum::{
    Router,
    routing::{any, get},
};

use crate::state::AppState;

/// Create all routes for the intake service.
///
/// `/orders` is registered with `any` so that method dispatch (preflight vs
/// create vs reject) happens inside the handler; rejected methods must get
/// the JSON error body rather than axum's bare 405.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/orders", any(orders::handle))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
