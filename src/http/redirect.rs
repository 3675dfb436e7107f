//! Redirect responder.

use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Answer with `Location: destination` and `status`, no body.
///
/// The destination is passed through untouched. If it cannot be carried in
/// a header at all (control characters), the misconfiguration is reported
/// as a 500 instead.
pub fn respond(destination: &str, status: StatusCode) -> Response {
    match HeaderValue::from_bytes(destination.as_bytes()) {
        Ok(location) => (status, [(LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(destination = ?destination, "Redirect destination is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
