//! Orderdesk intake library.
//!
//! This crate provides the order intake service as a library, allowing the
//! router to be spawned in tests and reused by the binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod supabase;

use axum::{Router, body::Body, http::Request};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use config::IntakeConfig;
use state::AppState;

/// Build the intake router with its logging and request-id layers.
///
/// Layer order (outermost first): set `x-request-id` when missing, trace
/// with a span carrying the id, propagate the id onto the response.
#[must_use]
pub fn app(config: IntakeConfig) -> Router {
    let state = AppState::new(config);

    routes::routes()
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Span for one inbound request, tagged with the request id for correlation.
fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
