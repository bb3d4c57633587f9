//! Poller status HTTP endpoint.
//!
//! GET /api/v1/poller/status — returns the current state of the background
//! alert poller as JSON.

use axum::extract::State;
use axum::Json;

use crate::routes::AppState;
use crate::services::poller::AlertPollerState;

/// Get the current poller status.
///
/// Returns cycle counters, the last poll result and the size of the
/// cached alert list.
#[utoipa::path(
    get,
    path = "/api/v1/poller/status",
    tag = "Poller",
    responses(
        (status = 200, description = "Current poller status", body = AlertPollerState),
    )
)]
pub async fn get_poller_status(State(state): State<AppState>) -> Json<AlertPollerState> {
    let s = state.alerts.read().await;
    Json(s.clone())
}
