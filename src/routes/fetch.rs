//! Fetch endpoint for aggregate statistics over sensor metrics.
//!
//! Thin HTTP wiring around the aggregation core in [`crate::query`]:
//! request-shape validation happens here (rendered as `VALIDATION_FAILED`
//! with a field→message map), then the core runs and its errors are
//! translated to the API error shape.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use tracing::{debug, error, info, warn};

use crate::error::{error_response, internal_error, ApiJson, ErrorCode, FetchError};
use crate::models::FetchRequest;
use crate::query;
use crate::trace::TraceId;

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/weather/metrics/v1/fetch", post(handler))
}

async fn handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    ApiJson(request): ApiJson<FetchRequest>,
) -> Response {
    // ---
    info!("Fetching request");
    debug!("Fetch request {:?}", request);

    let field_errors = request.validate();
    if !field_errors.is_empty() {
        warn!(
            "Validation failed [traceId={}]: {} field errors - {:?}",
            trace_id,
            field_errors.len(),
            field_errors
        );
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationFailed,
            "Request validation failed. Please check the field errors.",
            &trace_id,
            serde_json::to_value(&field_errors).ok(),
        );
    }

    match query::run(&state.store, state.clock.as_ref(), &request).await {
        Ok(response) => {
            info!("Fetch query completed");
            debug!("Fetch response: {:?}", response);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(FetchError::InvalidArgument(message)) => {
            warn!("Invalid argument [traceId={}]: {}", trace_id, message);
            error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                message,
                &trace_id,
                None,
            )
        }
        Err(FetchError::Store(e)) => {
            error!("Unexpected error [traceId={}]: {:#}", trace_id, e);
            internal_error(&trace_id)
        }
    }
}
