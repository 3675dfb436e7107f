//! Response helpers shared by every dispatch outcome.
//!
//! # Responsibilities
//! - Stamp the serving table generation on responses
//! - Build not-found and gateway error responses

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Header carrying the generation of the table that served the request.
pub const X_ROUTER_VERSION: HeaderName = HeaderName::from_static("x-router-version");

/// Set `X-Router-Version` to `generation` in base 10.
pub fn stamp_generation(response: &mut Response<Body>, generation: u64) {
    response
        .headers_mut()
        .insert(X_ROUTER_VERSION, HeaderValue::from(generation));
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

pub fn gateway_error(status: StatusCode) -> Response {
    (status, "Upstream request failed\n").into_response()
}
