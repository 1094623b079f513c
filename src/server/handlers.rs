use crate::error::RegistryError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, info};

use super::server::ServerState;

/// Handler for listing every locker record, ordered by id
pub async fn list_lockers_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let lockers = state.service.list_lockers();

    debug!("Listing {} lockers", lockers.len());

    (StatusCode::OK, Json(lockers))
}

/// Handler for reading a single locker's state
pub async fn get_locker_handler(
    State(state): State<ServerState>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_locker_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.service.get_locker(id) {
        Ok(locker) => (StatusCode::OK, Json(locker)).into_response(),
        Err(RegistryError::NotFound { id }) => locker_not_found(id),
    }
}

/// Handler for requesting that a locker be opened.
///
/// On success the locker is marked open and its id is queued for the
/// hardware poller; the response carries the updated record.
pub async fn open_locker_handler(
    State(state): State<ServerState>,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_locker_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.service.request_open(id) {
        Ok(locker) => {
            info!("Open request accepted for locker {}", id);
            (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Locker {} queued for opening", id),
                    "casier": locker,
                })),
            )
                .into_response()
        }
        Err(RegistryError::NotFound { id }) => locker_not_found(id),
    }
}

/// Handler for the hardware poller's dispatch-queue poll.
///
/// An empty queue is not an error: it answers 204 with no body, and the
/// poller tries again on its own cadence.
pub async fn next_pending_handler(State(state): State<ServerState>) -> Response {
    match state.service.next_pending() {
        Some(id) => (StatusCode::OK, Json(json!({ "casierId": id }))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Handler for the health/aggregate endpoint
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = state.service.stats();

    let health_info = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "lockers": {
            "total": stats.total,
            "closed": stats.closed,
            "open": stats.open,
            "maintenance": stats.maintenance,
        },
        "dispatch": {
            "pending": stats.dispatch.pending,
            "enqueued_total": stats.dispatch.enqueued_total,
            "dispatched_total": stats.dispatch.dispatched_total,
        },
        "server_info": {
            "subscribers": state.event_bus.subscriber_count(),
        }
    });

    (StatusCode::OK, Json(health_info))
}

/// Fallback handler for unmatched routes and methods
pub async fn route_fallback_handler() -> Response {
    route_not_found()
}

/// Parse a locker id path segment.
///
/// The id routes only ever matched numeric segments in the original route
/// scheme, so a non-numeric segment is a route-not-found condition rather
/// than a locker-not-found one. A numeric id too large for `u32` can never
/// name a locker and reports not-found.
fn parse_locker_id(raw: &str) -> std::result::Result<u32, Response> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(route_not_found());
    }

    raw.parse::<u32>().map_err(|_| {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
    })
}

fn locker_not_found(id: u32) -> Response {
    debug!("Locker {} not found", id);

    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "route not found" })),
    )
        .into_response()
}
