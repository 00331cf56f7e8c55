//! Route gateway: merges the per-endpoint subrouters, owns the shared
//! application state, and installs the trace-id middleware plus the
//! API-shaped 404/405 fallbacks.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::Response,
    Extension, Router,
};
use sqlx::PgPool;

use crate::clock::{Clock, SystemClock};
use crate::error::{error_response, ErrorCode};
use crate::store::PgReadingStore;
use crate::trace::{self, TraceId};

mod fetch;
mod health;
mod update;

// ---

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub store: PgReadingStore,
    pub clock: Arc<dyn Clock>,
}

pub fn router(pool: PgPool) -> Router {
    // ---
    let state = AppState {
        store: PgReadingStore::new(pool),
        clock: Arc::new(SystemClock),
    };

    Router::new()
        .merge(fetch::router())
        .merge(update::router())
        .merge(health::router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(trace::attach_trace_id))
        .with_state(state)
}

// ---

async fn not_found(Extension(trace_id): Extension<TraceId>) -> Response {
    // ---
    error_response(
        StatusCode::NOT_FOUND,
        ErrorCode::NotFound,
        "Resource not found",
        &trace_id,
        None,
    )
}

async fn method_not_allowed(Extension(trace_id): Extension<TraceId>) -> Response {
    // ---
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::MethodNotAllowed,
        "HTTP method not supported for this endpoint",
        &trace_id,
        None,
    )
}
