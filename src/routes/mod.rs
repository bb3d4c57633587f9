pub mod alerts;
pub mod climate;
pub mod forecasts;
pub mod health;
pub mod poller;
pub mod regions;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::errors::AppError;
use crate::services::alerts::DefaultAlertPolicy;
use crate::services::kma::KmaClient;
use crate::services::poller::SharedAlertState;

/// Shared application state for all endpoints.
#[derive(Clone)]
pub struct AppState {
    pub kma: KmaClient,
    pub alerts: SharedAlertState,
    /// Top-level region that sorts first in the alert list (e.g. "경기")
    pub primary_alert_region: String,
    pub alert_policy: DefaultAlertPolicy,
}

/// Most recent hourly observation timestamp (`YYYYMMDDHH00`, KST).
///
/// An hour's sweep lands on the API Hub a few minutes past the hour, so
/// shortly after the top of the hour this still points at the previous one.
pub(crate) fn latest_observation_time(now: DateTime<Utc>) -> String {
    let kst = now + Duration::hours(9) - Duration::minutes(10);
    kst.format("%Y%m%d%H00").to_string()
}

/// The hour before a `YYYYMMDDHHMM` timestamp, for retrying a sweep that
/// has not landed yet.
pub(crate) fn previous_hour(tm: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(tm, "%Y%m%d%H%M")
        .ok()
        .map(|dt| (dt - Duration::hours(1)).format("%Y%m%d%H00").to_string())
}

/// Validate a `YYYYMMDDHHMM` query timestamp.
pub(crate) fn validate_datetime(tm: &str) -> Result<(), AppError> {
    NaiveDateTime::parse_from_str(tm, "%Y%m%d%H%M")
        .map(|_| ())
        .map_err(|_| {
            AppError::BadRequest(format!(
                "Invalid datetime '{}', expected YYYYMMDDHHMM",
                tm
            ))
        })
}

/// Validate a `YYYYMMDD` query date.
pub(crate) fn validate_date(tm: &str) -> Result<(), AppError> {
    NaiveDate::parse_from_str(tm, "%Y%m%d").map(|_| ()).map_err(|_| {
        AppError::BadRequest(format!("Invalid date '{}', expected YYYYMMDD", tm))
    })
}
