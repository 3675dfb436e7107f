use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinError;

use crate::admin::AdminState;
use crate::routing::RouterError;
use crate::store::{ConfigStore, RedirectRecord, RouteRecord};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub generation: u64,
    pub entries: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let table = state.router.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        generation: table.generation(),
        entries: table.len(),
    })
}

pub async fn list_routes(State(state): State<AdminState>) -> Response {
    match state.store.list_routes() {
        Ok(routes) => Json(routes).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

pub async fn list_redirects(State(state): State<AdminState>) -> Response {
    match state.store.list_redirects() {
        Ok(redirects) => Json(redirects).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

pub async fn add_routes(State(state): State<AdminState>, body: Bytes) -> Response {
    tracing::info!("Received add route request");
    let routes: Vec<RouteRecord> = match parse_body(&body) {
        Ok(routes) => routes,
        Err(response) => return response,
    };

    let store = state.store.clone();
    mutation_response(tokio::task::spawn_blocking(move || store.add_routes(routes)).await)
}

pub async fn add_redirects(State(state): State<AdminState>, body: Bytes) -> Response {
    tracing::info!("Received add redirect request");
    let redirects: Vec<RedirectRecord> = match parse_body(&body) {
        Ok(redirects) => redirects,
        Err(response) => return response,
    };

    let store = state.store.clone();
    mutation_response(tokio::task::spawn_blocking(move || store.add_redirects(redirects)).await)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Invalid JSON in admin request");
        (StatusCode::BAD_REQUEST, "invalid json in request").into_response()
    })
}

/// Map the outcome of a store mutation.
///
/// Mutations rebuild the whole table under the store's locks, so they run on
/// the blocking pool and are joined here.
fn mutation_response(result: Result<Result<Option<u64>, RouterError>, JoinError>) -> Response {
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Store mutation task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match result {
        Ok(generation) => {
            tracing::debug!(generation = ?generation, "Store mutation applied");
            StatusCode::CREATED.into_response()
        }
        Err(e @ RouterError::ConfigurationUnavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    }
}
