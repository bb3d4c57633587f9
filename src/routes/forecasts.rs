//! Village forecast HTTP endpoint.
//!
//! - GET /api/v1/forecasts/:name

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::forecast::{
    base_date_time, parse_forecast_items, previous_base_time, ForecastPoint,
};
use crate::services::stations::resolve_region;

/// Forecast slots returned per request (one day ahead).
const MAX_FORECAST_POINTS: usize = 24;

/// Hourly forecast for one municipality's grid cell.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegionForecastResponse {
    /// Municipality name
    pub region: String,
    /// Forecast grid coordinates
    pub nx: i32,
    pub ny: i32,
    /// Issue date of the run the data came from (`YYYYMMDD`)
    pub base_date: String,
    /// Issue time of the run (`HHMM`)
    pub base_time: String,
    /// Hourly forecast slots, chronological, capped at 24
    pub points: Vec<ForecastPoint>,
}

/// Get the short-term hourly forecast for a municipality.
///
/// Uses the freshest retrievable issue; a run that has no rows upstream
/// yet falls back to the previous issue three hours earlier.
#[utoipa::path(
    get,
    path = "/api/v1/forecasts/{name}",
    tag = "Forecasts",
    params(
        ("name" = String, Path, description = "Municipality name (e.g. 수원시)"),
    ),
    responses(
        (status = 200, description = "Hourly forecast for the municipality", body = RegionForecastResponse),
        (status = 404, description = "Unknown municipality", body = ErrorResponse),
        (status = 502, description = "KMA forecast service unreachable or empty", body = ErrorResponse),
    )
)]
pub async fn get_region_forecast(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RegionForecastResponse>, AppError> {
    let region = resolve_region(&name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown municipality: {}", name)))?;

    let (mut base_date, mut base_time) = base_date_time(Utc::now());
    let mut items = state
        .kma
        .fetch_vilage_forecast(region.nx, region.ny, &base_date, &base_time)
        .await?;

    if items.is_empty() {
        // The freshest run publishes with some lag; retry the previous issue
        let prev_time = previous_base_time(&base_time);
        let prev_date = if base_time == "0200" {
            previous_date(&base_date)
        } else {
            base_date.clone()
        };
        tracing::debug!(
            "Forecast run {} {} empty, retrying {} {}",
            base_date,
            base_time,
            prev_date,
            prev_time,
        );
        items = state
            .kma
            .fetch_vilage_forecast(region.nx, region.ny, &prev_date, &prev_time)
            .await?;
        base_date = prev_date;
        base_time = prev_time;
    }

    if items.is_empty() {
        return Err(AppError::ExternalServiceError(format!(
            "No forecast rows for grid ({}, {})",
            region.nx, region.ny
        )));
    }

    let mut points = parse_forecast_items(&items);
    points.truncate(MAX_FORECAST_POINTS);

    Ok(Json(RegionForecastResponse {
        region: region.name.to_string(),
        nx: region.nx,
        ny: region.ny,
        base_date,
        base_time,
        points,
    }))
}

/// The calendar day before a `YYYYMMDD` date. Unparseable input is
/// returned unchanged (the upstream call will fail visibly instead).
fn previous_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y%m%d")
        .map(|d| (d - Duration::days(1)).format("%Y%m%d").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_date() {
        assert_eq!(previous_date("20250106"), "20250105");
        assert_eq!(previous_date("20250101"), "20241231");
        assert_eq!(previous_date("bogus"), "bogus");
    }
}
