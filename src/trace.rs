//! Per-request trace identifier.
//!
//! A middleware assigns every request a fresh v4 UUID, stores it in the
//! request extensions for handlers to pick up, and mirrors it on the
//! `X-Trace-Id` response header. The id travels as an explicit extension
//! value through the call chain; there is no ambient task-local state.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

// ---

pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Request-scoped correlation id, echoed on every response.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new() -> Self {
        TraceId(Uuid::new_v4().to_string())
    }
}

impl Default for TraceId {
    // ---
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    // ---
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Middleware: attach a trace id to the request and the response header.
pub async fn attach_trace_id(mut req: Request, next: Next) -> Response {
    // ---
    let trace_id = TraceId::new();
    req.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}
