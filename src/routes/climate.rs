//! Climate comfort map HTTP endpoint.
//!
//! - GET /api/v1/climate/map?target=elderly&datetime=YYYYMMDDHHMM

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{latest_observation_time, previous_hour, validate_datetime, AppState};
use crate::services::climate::{build_region_scores, RegionScore};
use crate::services::poller::kst_hour;
use crate::services::scoring::TargetGroup;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClimateMapQuery {
    /// Audience group: elderly, child, outdoor or general (default)
    pub target: Option<String>,
    /// Observation timestamp in KST (`YYYYMMDDHHMM`); defaults to the most
    /// recent hourly sweep
    pub datetime: Option<String>,
}

/// Scored climate map for every municipality.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClimateMapResponse {
    /// Audience group the adjusted scores are for
    pub target: TargetGroup,
    /// Korean audience label
    pub target_label: &'static str,
    /// Score multiplier applied for the audience
    pub multiplier: f64,
    /// Observation timestamp the sweep was taken at (`YYYYMMDDHHMM`, KST)
    pub observed_at: String,
    /// One scored entry per municipality with data
    pub regions: Vec<RegionScore>,
}

/// Get the scored climate comfort map.
///
/// One all-station sweep feeds every municipality; if the requested hour
/// has not landed upstream yet, the previous hour is retried once.
#[utoipa::path(
    get,
    path = "/api/v1/climate/map",
    tag = "Climate",
    params(ClimateMapQuery),
    responses(
        (status = 200, description = "Scored climate map", body = ClimateMapResponse),
        (status = 400, description = "Invalid datetime format", body = ErrorResponse),
        (status = 502, description = "KMA API Hub unreachable or no data", body = ErrorResponse),
    )
)]
pub async fn get_climate_map(
    State(state): State<AppState>,
    Query(params): Query<ClimateMapQuery>,
) -> Result<Json<ClimateMapResponse>, AppError> {
    let target = TargetGroup::from_key(params.target.as_deref().unwrap_or("general"));

    let now = Utc::now();
    let (mut tm, is_latest) = match params.datetime {
        Some(tm) => {
            validate_datetime(&tm)?;
            (tm, false)
        }
        None => (latest_observation_time(now), true),
    };

    // stn=0 returns the whole network in one response
    let mut records = state.kma.fetch_surface(&tm, 0).await?;
    if records.is_empty() && is_latest {
        if let Some(prev) = previous_hour(&tm) {
            tracing::debug!("Sweep {} not up yet, retrying {}", tm, prev);
            records = state.kma.fetch_surface(&prev, 0).await?;
            tm = prev;
        }
    }

    if records.is_empty() {
        return Err(AppError::ExternalServiceError(format!(
            "No observations in sweep {}",
            tm
        )));
    }

    // UV fallback heuristic keys off the hour of the sweep, not the wall clock
    let sweep_hour = tm
        .get(8..10)
        .and_then(|h| h.parse().ok())
        .unwrap_or_else(|| kst_hour(now));
    let regions = build_region_scores(&records, target, sweep_hour);

    Ok(Json(ClimateMapResponse {
        target,
        target_label: target.label(),
        multiplier: target.multiplier(),
        observed_at: tm,
        regions,
    }))
}
