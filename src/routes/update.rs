//! Update endpoint: ingest one set of metric readings from a sensor.
//!
//! The server stamps the timestamp from the injected clock; the store
//! persists a snapshot marker plus one reading row per provided metric in a
//! single transaction. Duplicate (sensor, timestamp, metric) submissions
//! surface as 409 CONFLICT.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use tracing::{debug, error, info, warn};

use crate::error::{error_response, internal_error, ApiJson, ErrorCode};
use crate::models::{UpdateRequest, UpdateResponse};
use crate::trace::TraceId;

use super::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/weather/metrics/v1/update", post(handler))
}

async fn handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    ApiJson(request): ApiJson<UpdateRequest>,
) -> Response {
    // ---
    info!("Received update request");
    debug!("Update request {:?}", request);

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

    // Both are guaranteed present once validation passed.
    let (Some(sensor_id), Some(metrics)) = (request.sensor_id.as_deref(), request.metrics.as_ref())
    else {
        return internal_error(&trace_id);
    };

    let sensor_id = sensor_id.trim();
    let ts = state.clock.now();
    let provided = metrics.provided();

    debug!(
        "Starting ingestion for sensor: {} at timestamp: {}",
        sensor_id, ts
    );

    match state.store.record_snapshot(sensor_id, ts, &provided).await {
        Ok(saved_count) => {
            info!(
                "Ingestion complete: sensor={}, metrics_saved={}",
                sensor_id, saved_count
            );
            let response = UpdateResponse {
                sensor_id: sensor_id.to_string(),
                timestamp: ts,
                saved_count,
            };
            debug!("Update response: {:?}", response);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) if is_unique_violation(&e) => {
            warn!("Duplicate reading [traceId={}]: {}", trace_id, e);
            error_response(
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
                "A reading for this sensor and timestamp already exists",
                &trace_id,
                None,
            )
        }
        Err(e) => {
            error!("Unexpected error [traceId={}]: {}", trace_id, e);
            internal_error(&trace_id)
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    // ---
    e.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}
