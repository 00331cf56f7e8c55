//! Error vocabulary and wire shape for the metrics API.
//!
//! Every non-2xx response carries the same JSON body: a stable error code,
//! a human-readable message, the request's trace id, and optional detail
//! payload (e.g. the field→message map from request validation). The core
//! aggregator surfaces its failures through [`FetchError`]; the routes
//! translate them here.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::trace::TraceId;

// ---

/// Machine-readable error categories exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ---
    BadRequest,
    ValidationFailed,
    NotFound,
    MethodNotAllowed,
    UnsupportedMediaType,
    Conflict,
    DataUnavailable,
    InternalError,
}

/// JSON body returned for any 4xx/5xx response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    // ---
    status: &'static str,
    error_code: ErrorCode,
    message: String,
    trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        trace_id: &TraceId,
        details: Option<serde_json::Value>,
    ) -> Self {
        // ---
        ApiError {
            status: "error",
            error_code: code,
            message: message.into(),
            trace_id: trace_id.0.clone(),
            details,
        }
    }
}

/// Build a complete error response with the given HTTP status.
pub fn error_response(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    trace_id: &TraceId,
    details: Option<serde_json::Value>,
) -> Response {
    // ---
    (status, Json(ApiError::new(code, message, trace_id, details))).into_response()
}

/// 500 with the generic message; internals are logged, never echoed.
pub fn internal_error(trace_id: &TraceId) -> Response {
    // ---
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::InternalError,
        "An unexpected error occurred. Please contact support with the trace ID.",
        trace_id,
        None,
    )
}

// ---

/// Failure modes of the fetch aggregation core.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    // ---
    /// Client-correctable problem with the query; maps to 400 BAD_REQUEST
    /// with the literal message. Callers match on message content, so the
    /// texts are part of the contract.
    #[error("{0}")]
    InvalidArgument(String),

    /// Store or other infrastructure failure; maps to 500 INTERNAL_ERROR.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// ---

/// JSON extractor that renders rejections in the API error shape.
///
/// Axum's stock `Json` rejection replies in plain text; this wrapper keeps
/// malformed-body and content-type failures on the same contract as every
/// other error, trace id included.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // ---
        let trace_id = req
            .extensions()
            .get::<TraceId>()
            .cloned()
            .unwrap_or_default();

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::warn!("Malformed request [traceId={}]: {}", trace_id, rejection);
                Err(rejection_response(rejection, &trace_id))
            }
        }
    }
}

fn rejection_response(rejection: JsonRejection, trace_id: &TraceId) -> Response {
    // ---
    match rejection {
        JsonRejection::MissingJsonContentType(_) => error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::UnsupportedMediaType,
            "Content-Type not supported. Please use application/json",
            trace_id,
            None,
        ),
        JsonRejection::JsonSyntaxError(_) => error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "Invalid JSON format. Please check your request body.",
            trace_id,
            None,
        ),
        _ => error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "Malformed JSON request",
            trace_id,
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn error_codes_serialize_in_screaming_snake_case() {
        // ---
        let json = serde_json::to_string(&ErrorCode::ValidationFailed).unwrap();
        assert_eq!(json, "\"VALIDATION_FAILED\"");

        let json = serde_json::to_string(&ErrorCode::UnsupportedMediaType).unwrap();
        assert_eq!(json, "\"UNSUPPORTED_MEDIA_TYPE\"");
    }

    #[test]
    fn api_error_body_matches_the_wire_contract() {
        // ---
        let trace_id = TraceId("abc-123".to_string());
        let body = ApiError::new(ErrorCode::BadRequest, "bad dates", &trace_id, None);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["errorCode"], "BAD_REQUEST");
        assert_eq!(json["message"], "bad dates");
        assert_eq!(json["traceId"], "abc-123");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn invalid_argument_messages_pass_through() {
        // ---
        let err = FetchError::InvalidArgument("Date range must not exceed 31 days".into());
        assert!(err.to_string().contains("31 days"));
    }
}
