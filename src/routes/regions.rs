//! Region HTTP endpoints.
//!
//! - GET /api/v1/regions
//! - GET /api/v1/regions/:name/observation?datetime=YYYYMMDDHHMM
//! - GET /api/v1/regions/:name/history?from=YYYYMMDDHHMM&to=YYYYMMDDHHMM
//! - GET /api/v1/regions/:name/daily?from=YYYYMMDD&to=YYYYMMDD
//! - GET /api/v1/regions/:name/climatology?month=N

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{latest_observation_time, previous_hour, validate_date, validate_datetime, AppState};
use crate::services::climate::{monthly_climatology, MonthlyClimatology};
use crate::services::stations::{resolve_region, Region, GYEONGGI_REGIONS};
use crate::services::surface::{ObservationRecord, SurfaceRecord};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct ObservationQuery {
    /// Observation timestamp in KST (`YYYYMMDDHHMM`); defaults to the most
    /// recent hourly sweep
    pub datetime: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeQuery {
    /// Range start (`YYYYMMDDHHMM` for hourly, `YYYYMMDD` for daily), KST
    pub from: String,
    /// Range end, same format as `from`
    pub to: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClimatologyQuery {
    /// Calendar month (1–12)
    pub month: u32,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Daily surface summaries for one region, passed through in upstream
/// column order.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailySummaryResponse {
    /// Municipality name
    pub region: String,
    /// Observation station display name
    pub station: String,
    /// One entry per day, keyed by upstream column names
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<SurfaceRecord>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List the Gyeonggi municipalities and their observation stations.
#[utoipa::path(
    get,
    path = "/api/v1/regions",
    tag = "Regions",
    responses(
        (status = 200, description = "All municipalities with station mapping", body = [Region]),
    )
)]
pub async fn list_regions() -> Json<&'static [Region]> {
    Json(&GYEONGGI_REGIONS[..])
}

fn region_or_404(name: &str) -> Result<&'static Region, AppError> {
    resolve_region(name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown municipality: {}", name)))
}

/// Get one hourly observation for a municipality.
///
/// Without `datetime` the most recent sweep is used; if that sweep has not
/// landed upstream yet, the previous hour is retried once.
#[utoipa::path(
    get,
    path = "/api/v1/regions/{name}/observation",
    tag = "Regions",
    params(
        ("name" = String, Path, description = "Municipality name (e.g. 수원시)"),
        ObservationQuery,
    ),
    responses(
        (status = 200, description = "Hourly observation", body = ObservationRecord),
        (status = 400, description = "Invalid datetime format", body = ErrorResponse),
        (status = 404, description = "Unknown municipality", body = ErrorResponse),
        (status = 502, description = "KMA API Hub unreachable or no data", body = ErrorResponse),
    )
)]
pub async fn get_region_observation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ObservationQuery>,
) -> Result<Json<ObservationRecord>, AppError> {
    let region = region_or_404(&name)?;

    let (tm, is_latest) = match params.datetime {
        Some(tm) => {
            validate_datetime(&tm)?;
            (tm, false)
        }
        None => (latest_observation_time(Utc::now()), true),
    };

    let mut records = state.kma.fetch_surface(&tm, region.station_id).await?;
    if records.is_empty() && is_latest {
        // The freshest sweep can lag a few minutes; fall back one hour
        if let Some(prev) = previous_hour(&tm) {
            tracing::debug!("No records at {}, retrying {}", tm, prev);
            records = state.kma.fetch_surface(&prev, region.station_id).await?;
        }
    }

    let record = records.first().ok_or_else(|| {
        AppError::ExternalServiceError(format!(
            "No observation for station {} at {}",
            region.station_id, tm
        ))
    })?;

    Ok(Json(ObservationRecord::from_record(
        region.name,
        region.station_name,
        record,
    )))
}

/// Get hourly observations over a time range.
#[utoipa::path(
    get,
    path = "/api/v1/regions/{name}/history",
    tag = "Regions",
    params(
        ("name" = String, Path, description = "Municipality name"),
        RangeQuery,
    ),
    responses(
        (status = 200, description = "Hourly observations in the range", body = [ObservationRecord]),
        (status = 400, description = "Invalid range", body = ErrorResponse),
        (status = 404, description = "Unknown municipality", body = ErrorResponse),
        (status = 502, description = "KMA API Hub unreachable", body = ErrorResponse),
    )
)]
pub async fn get_region_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<ObservationRecord>>, AppError> {
    let region = region_or_404(&name)?;
    validate_datetime(&params.from)?;
    validate_datetime(&params.to)?;
    if params.from > params.to {
        return Err(AppError::BadRequest(
            "'from' must not be after 'to'".to_string(),
        ));
    }

    let records = state
        .kma
        .fetch_surface_period(&params.from, &params.to, region.station_id)
        .await?;

    let observations = records
        .iter()
        .map(|rec| ObservationRecord::from_record(region.name, region.station_name, rec))
        .collect();
    Ok(Json(observations))
}

/// Get daily surface summaries over a date range.
#[utoipa::path(
    get,
    path = "/api/v1/regions/{name}/daily",
    tag = "Regions",
    params(
        ("name" = String, Path, description = "Municipality name"),
        RangeQuery,
    ),
    responses(
        (status = 200, description = "Daily summaries in the range", body = DailySummaryResponse),
        (status = 400, description = "Invalid range", body = ErrorResponse),
        (status = 404, description = "Unknown municipality", body = ErrorResponse),
        (status = 502, description = "KMA API Hub unreachable", body = ErrorResponse),
    )
)]
pub async fn get_region_daily(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<DailySummaryResponse>, AppError> {
    let region = region_or_404(&name)?;
    validate_date(&params.from)?;
    validate_date(&params.to)?;
    if params.from > params.to {
        return Err(AppError::BadRequest(
            "'from' must not be after 'to'".to_string(),
        ));
    }

    let records = state
        .kma
        .fetch_daily(&params.from, &params.to, region.station_id)
        .await?;

    Ok(Json(DailySummaryResponse {
        region: region.name.to_string(),
        station: region.station_name.to_string(),
        records,
    }))
}

/// Get the 10-year climatology for one calendar month.
#[utoipa::path(
    get,
    path = "/api/v1/regions/{name}/climatology",
    tag = "Regions",
    params(
        ("name" = String, Path, description = "Municipality name"),
        ClimatologyQuery,
    ),
    responses(
        (status = 200, description = "Monthly climatology", body = MonthlyClimatology),
        (status = 400, description = "Invalid month", body = ErrorResponse),
        (status = 404, description = "Unknown municipality", body = ErrorResponse),
        (status = 502, description = "No monthly history available", body = ErrorResponse),
    )
)]
pub async fn get_region_climatology(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ClimatologyQuery>,
) -> Result<Json<MonthlyClimatology>, AppError> {
    let region = region_or_404(&name)?;
    if !(1..=12).contains(&params.month) {
        return Err(AppError::BadRequest(format!(
            "month must be 1-12, got {}",
            params.month
        )));
    }

    let current_year = (Utc::now() + Duration::hours(9)).year();
    let climatology = monthly_climatology(&state.kma, region, params.month, current_year).await?;
    Ok(Json(climatology))
}
