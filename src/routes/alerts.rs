//! Weather alert HTTP endpoint.
//!
//! - GET /api/v1/alerts

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;
use crate::services::alerts::AlertRecord;
use crate::services::kma::{LIFE_FEED_URL, WARNING_FEED_URL};
use crate::services::poller::{kst_hour, poll_once};

/// Active weather alerts.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    /// "cache" when served from the poller, "live" when fetched on demand,
    /// "default" when every feed was unreachable
    pub source: String,
    /// When the served list was produced
    pub updated_at: Option<DateTime<Utc>>,
    pub count: usize,
    pub alerts: Vec<AlertRecord>,
}

/// Get the current alert list.
///
/// Served from the background poller's cache once it has completed a
/// cycle. Before that (or after a restart) the feeds are fetched on
/// demand; if every feed is down, the time-of-day default message is
/// returned instead of an error.
#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "Active alerts, primary region first", body = AlertsResponse),
    )
)]
pub async fn get_alerts(State(state): State<AppState>) -> Json<AlertsResponse> {
    {
        let cached = state.alerts.read().await;
        if cached.total_polls > 0 && cached.last_poll_result == "ok" {
            return Json(AlertsResponse {
                source: "cache".to_string(),
                updated_at: cached.last_poll_completed_at,
                count: cached.alerts.len(),
                alerts: cached.alerts.clone(),
            });
        }
    }

    let now = Utc::now();
    match poll_once(
        &state.kma,
        LIFE_FEED_URL,
        WARNING_FEED_URL,
        &state.primary_alert_region,
        &state.alert_policy,
        now,
    )
    .await
    {
        Some(alerts) => Json(AlertsResponse {
            source: "live".to_string(),
            updated_at: Some(now),
            count: alerts.len(),
            alerts,
        }),
        None => {
            let alerts = state.alert_policy.default_alerts(now, kst_hour(now));
            Json(AlertsResponse {
                source: "default".to_string(),
                updated_at: Some(now),
                count: alerts.len(),
                alerts,
            })
        }
    }
}
