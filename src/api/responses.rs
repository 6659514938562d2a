//! The JSON error bodies of the read-only API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[must_use]
pub fn invalid_id() -> Response {
    error(StatusCode::BAD_REQUEST, "Invalid integer ID")
}

#[must_use]
pub fn undefined_api_call() -> Response {
    error(StatusCode::NOT_FOUND, "Undefined API call")
}

#[must_use]
pub fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not found")
}

#[must_use]
pub fn method_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[must_use]
pub fn internal_error() -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, "API could not generate response")
}
