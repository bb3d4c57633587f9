//! Per-region climate comfort assembly.
//!
//! Joins one all-station hourly observation sweep against the Gyeonggi
//! municipality table, derives the variables the surface network does not
//! measure directly (apparent temperature, particulates from visibility,
//! UV from solar radiation) and scores each region. Also computes the
//! 10-year monthly climatology used for the seasonal baseline view.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::kma::KmaClient;
use crate::services::scoring::{
    adjust_score_for_target, apparent_temperature, calculate_climate_score,
    estimate_pm_from_visibility, estimate_uv_index, ClimateInputs, RiskLevel, TargetGroup,
};
use crate::services::stations::{Region, GYEONGGI_REGIONS};
use crate::services::surface::SurfaceRecord;

/// Years of history folded into a monthly climatology.
const CLIMATOLOGY_YEARS: i32 = 10;

/// One municipality's scored climate state for the map view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegionScore {
    /// Municipality name
    pub region: String,
    /// Administrative code
    pub code: String,
    pub lat: f64,
    pub lng: f64,
    /// Observation station display name
    pub station: String,
    pub station_id: i32,
    /// Base comfort score (0–100, higher is worse)
    pub score: u8,
    /// Score after the audience multiplier
    pub adjusted_score: u8,
    pub risk_level: RiskLevel,
    /// Korean tier label
    pub risk_label: &'static str,
    /// Map display color for the tier
    pub risk_color: &'static str,
    /// Tier marker for compact displays
    pub risk_emoji: &'static str,
    /// Observation timestamp (`YYYYMMDDHHMM`, KST)
    pub observed_at: Option<String>,
    /// The measured and derived variables behind the score
    pub climate: ClimateInputs,
}

/// Score every municipality from one all-station observation sweep.
///
/// Regions whose station is absent from the sweep are skipped rather than
/// scored on defaults. `kst_hour` feeds the UV time-of-day fallback.
pub fn build_region_scores(
    records: &[SurfaceRecord],
    target: TargetGroup,
    kst_hour: u32,
) -> Vec<RegionScore> {
    let by_station: HashMap<i32, &SurfaceRecord> = records
        .iter()
        .filter_map(|rec| rec.station_id().map(|id| (id, rec)))
        .collect();

    GYEONGGI_REGIONS
        .iter()
        .filter_map(|region| {
            by_station
                .get(&region.station_id)
                .map(|rec| score_region(region, rec, target, kst_hour))
        })
        .collect()
}

fn score_region(
    region: &Region,
    record: &SurfaceRecord,
    target: TargetGroup,
    kst_hour: u32,
) -> RegionScore {
    let temperature = record.number("TA");
    let humidity = record.number("HM");
    let wind_speed = record.number("WS");

    let apparent = temperature.map(|ta| apparent_temperature(ta, humidity, wind_speed));
    let (pm10, pm25) = estimate_pm_from_visibility(record.number("VS"));
    let uv = estimate_uv_index(record.number("SI"), kst_hour);
    // Ground temperature sensor is sparse; fall back to air temperature
    let surface = record.number("TS").or(temperature);

    let inputs = ClimateInputs {
        temperature,
        apparent_temperature: apparent,
        pm10: Some(pm10),
        pm25: Some(pm25),
        humidity,
        uv_index: Some(uv),
        surface_temperature: surface,
    };

    let (score, risk_level) = calculate_climate_score(&inputs);
    let adjusted_score = adjust_score_for_target(score, target);

    RegionScore {
        region: region.name.to_string(),
        code: region.code.to_string(),
        lat: region.lat,
        lng: region.lng,
        station: region.station_name.to_string(),
        station_id: region.station_id,
        score,
        adjusted_score,
        risk_level,
        risk_label: risk_level.label(),
        risk_color: risk_level.color(),
        risk_emoji: risk_level.emoji(),
        observed_at: record.timestamp(),
        climate: inputs,
    }
}

/// Long-term monthly averages for one municipality's station.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyClimatology {
    /// Municipality name
    pub region: String,
    /// Observation station display name
    pub station: String,
    /// Calendar month (1–12)
    pub month: u32,
    /// Number of years that contributed data
    pub years: usize,
    /// Mean of monthly average temperature (°C)
    pub temperature_avg: Option<f64>,
    /// Mean of monthly maximum temperature (°C)
    pub temperature_max: Option<f64>,
    /// Mean of monthly minimum temperature (°C)
    pub temperature_min: Option<f64>,
    /// Mean monthly humidity (%)
    pub humidity_avg: Option<f64>,
    /// Mean monthly wind speed (m/s)
    pub wind_speed_avg: Option<f64>,
    /// Mean monthly precipitation (mm)
    pub precipitation: Option<f64>,
    /// Mean monthly sunshine duration (h)
    pub sunshine: Option<f64>,
}

/// Average the valid values of one column across yearly records.
fn column_mean(records: &[SurfaceRecord], column: &str) -> Option<f64> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.number(column)).collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Fold yearly monthly-summary records into a climatology.
///
/// Missing values are excluded per column, so a station with a sensor gap
/// in one year still averages over the remaining years.
pub fn summarize_monthly_records(
    region: &Region,
    month: u32,
    records: &[SurfaceRecord],
) -> MonthlyClimatology {
    MonthlyClimatology {
        region: region.name.to_string(),
        station: region.station_name.to_string(),
        month,
        years: records.len(),
        temperature_avg: column_mean(records, "TA_AVG"),
        temperature_max: column_mean(records, "TA_MAX"),
        temperature_min: column_mean(records, "TA_MIN"),
        humidity_avg: column_mean(records, "HM_AVG"),
        wind_speed_avg: column_mean(records, "WS_AVG"),
        precipitation: column_mean(records, "RN_MON"),
        sunshine: column_mean(records, "SS_MON"),
    }
}

/// Fetch and average the last [`CLIMATOLOGY_YEARS`] of one calendar month.
///
/// Years are fetched concurrently. A year that fails upstream is logged
/// and skipped — the climatology degrades to fewer years instead of
/// failing the whole request.
pub async fn monthly_climatology(
    client: &KmaClient,
    region: &Region,
    month: u32,
    current_year: i32,
) -> Result<MonthlyClimatology, AppError> {
    let fetches = (1..=CLIMATOLOGY_YEARS).map(|back| {
        let year_month = format!("{:04}{:02}", current_year - back, month);
        async move { client.fetch_monthly(&year_month, region.station_id).await }
    });

    let mut records = Vec::new();
    for result in join_all(fetches).await {
        match result {
            Ok(mut yearly) => records.append(&mut yearly),
            Err(e) => {
                tracing::warn!(region = region.name, month, "climatology year fetch failed: {}", e);
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::ExternalServiceError(format!(
            "no monthly history available for station {}",
            region.station_id
        )));
    }

    Ok(summarize_monthly_records(region, month, &records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stations::resolve_region;
    use crate::services::surface::{parse_telemetry, SFCMM_COLUMNS, SFCTM_COLUMNS};

    // Two stations: 119 (수원, mild), 112 (인천, hot and hazy)
    const SWEEP: &str = "\
202507201400 119 320 2.1 -9 -9 -9 1013.2 1012.0 -9 -9 22.0 12.3 50 -9 0.0 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 5000 -9 0.5 -9 24.0\n\
202507201400 112 180 1.0 -9 -9 -9 1008.0 1007.0 -9 -9 34.0 25.0 85 -9 0.0 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 90 -9 3.5 -9 52.0\n";

    #[test]
    fn test_scores_one_entry_per_resolvable_region() {
        let records = parse_telemetry(SWEEP, &SFCTM_COLUMNS);
        let scores = build_region_scores(&records, TargetGroup::General, 14);
        // Only municipalities mapped to stations 119 and 112 appear
        assert!(!scores.is_empty());
        assert!(scores.iter().all(|s| s.station_id == 119 || s.station_id == 112));
        let suwon = scores.iter().find(|s| s.region == "수원시").unwrap();
        assert_eq!(suwon.station_id, 119);
        assert_eq!(suwon.climate.temperature, Some(22.0));
    }

    #[test]
    fn test_hot_hazy_region_scores_worse() {
        let records = parse_telemetry(SWEEP, &SFCTM_COLUMNS);
        let scores = build_region_scores(&records, TargetGroup::General, 14);
        let suwon = scores.iter().find(|s| s.station_id == 119).unwrap();
        let incheon = scores.iter().find(|s| s.station_id == 112).unwrap();
        assert!(incheon.score > suwon.score);
        assert_eq!(incheon.risk_level, RiskLevel::from_score(incheon.score));
        assert_eq!(incheon.risk_label, incheon.risk_level.label());
        assert_eq!(incheon.risk_emoji, incheon.risk_level.emoji());
    }

    #[test]
    fn test_derived_variables_flow_into_snapshot() {
        let records = parse_telemetry(SWEEP, &SFCTM_COLUMNS);
        let scores = build_region_scores(&records, TargetGroup::General, 14);
        let incheon = scores.iter().find(|s| s.station_id == 112).unwrap();
        // VS=90 → worst particulate tier
        assert_eq!(incheon.climate.pm10, Some(150.0));
        assert_eq!(incheon.climate.pm25, Some(80.0));
        // SI=3.5 → 10.5 rounds to 11 cap
        assert_eq!(incheon.climate.uv_index, Some(11.0));
        // TS=52 present, not the air-temperature fallback
        assert_eq!(incheon.climate.surface_temperature, Some(52.0));
        assert!(incheon.climate.apparent_temperature.unwrap() > 34.0);
    }

    #[test]
    fn test_target_multiplier_applied() {
        let records = parse_telemetry(SWEEP, &SFCTM_COLUMNS);
        let general = build_region_scores(&records, TargetGroup::General, 14);
        let elderly = build_region_scores(&records, TargetGroup::Elderly, 14);
        let g = general.iter().find(|s| s.station_id == 119).unwrap();
        let e = elderly.iter().find(|s| s.station_id == 119).unwrap();
        assert_eq!(g.score, e.score);
        assert_eq!(g.adjusted_score, g.score);
        assert_eq!(
            e.adjusted_score,
            adjust_score_for_target(e.score, TargetGroup::Elderly)
        );
    }

    #[test]
    fn test_missing_station_is_skipped() {
        let records = parse_telemetry("202507201400 999 320 2.1", &SFCTM_COLUMNS);
        let scores = build_region_scores(&records, TargetGroup::General, 14);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_climatology_averages_valid_years_only() {
        let region = resolve_region("수원시").unwrap();
        // Three years; the middle one is missing its temperature average
        let text = "\
201507 119 25.0 29.0 21.0 33.1 -9 18.0 -9 70 2.0 -9 -9 -9 300.0\n\
201607 119 -9 30.0 22.0 34.0 -9 19.0 -9 72 2.2 -9 -9 -9 250.0\n\
201707 119 27.0 31.0 23.0 35.5 -9 20.0 -9 74 2.4 -9 -9 -9 350.0\n";
        let records = parse_telemetry(text, &SFCMM_COLUMNS);
        let clim = summarize_monthly_records(region, 7, &records);
        assert_eq!(clim.years, 3);
        // TA_AVG from the two valid years
        assert_eq!(clim.temperature_avg, Some(26.0));
        assert_eq!(clim.humidity_avg, Some(72.0));
        assert_eq!(clim.precipitation, Some(300.0));
        assert_eq!(clim.month, 7);
        assert_eq!(clim.region, "수원시");
    }

    #[test]
    fn test_climatology_all_missing_column_is_none() {
        let region = resolve_region("수원시").unwrap();
        let records = parse_telemetry("201507 119 -9 -9", &SFCMM_COLUMNS);
        let clim = summarize_monthly_records(region, 7, &records);
        assert_eq!(clim.temperature_avg, None);
        assert_eq!(clim.years, 1);
    }
}
