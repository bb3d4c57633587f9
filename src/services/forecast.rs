//! KMA village short-term forecast (단기예보) parsing.
//!
//! The `VilageFcstInfoService_2.0` endpoint returns JSON rows keyed by
//! category code (TMP temperature, SKY sky condition, PTY precipitation
//! type, POP precipitation probability, REH humidity, WSD wind speed,
//! PCP hourly precipitation, SNO snowfall). Rows sharing a forecast
//! (date, time) are folded into one [`ForecastPoint`] per slot.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Forecast issue hours (KST). The service publishes eight runs per day.
const BASE_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];

/// Minutes after the hour before a fresh run is actually retrievable.
const PUBLICATION_DELAY_MIN: u32 = 10;

// --- upstream JSON response types ---

#[derive(Debug, Deserialize)]
pub struct VilageFcstResponse {
    pub response: VilageFcstBody,
}

#[derive(Debug, Deserialize)]
pub struct VilageFcstBody {
    pub body: Option<VilageFcstItems>,
}

#[derive(Debug, Deserialize)]
pub struct VilageFcstItems {
    pub items: VilageFcstItemList,
}

#[derive(Debug, Deserialize)]
pub struct VilageFcstItemList {
    #[serde(default)]
    pub item: Vec<FcstItem>,
}

/// One raw forecast row.
#[derive(Debug, Clone, Deserialize)]
pub struct FcstItem {
    pub category: String,
    #[serde(rename = "fcstDate")]
    pub fcst_date: String,
    #[serde(rename = "fcstTime")]
    pub fcst_time: String,
    #[serde(rename = "fcstValue")]
    pub fcst_value: String,
}

/// One forecast slot with all categories folded in.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ForecastPoint {
    /// Forecast date (`YYYYMMDD`)
    pub date: String,
    /// Forecast time (`HHMM`)
    pub time: String,
    /// Forecast hour (0–23)
    pub hour: u32,
    /// Temperature (°C)
    pub temperature: Option<f64>,
    /// Sky condition code (1 clear, 3 mostly cloudy, 4 overcast)
    pub sky: Option<String>,
    /// Precipitation type code (0 none, 1 rain, 2 rain/snow, 3 snow, 4 shower)
    pub pty: Option<String>,
    /// Precipitation probability (%)
    pub pop: Option<i32>,
    /// Relative humidity (%)
    pub humidity: Option<i32>,
    /// Wind speed (m/s)
    pub wind_speed: Option<f64>,
    /// Hourly precipitation ("0" when 강수없음, otherwise upstream text e.g. "1.0mm")
    pub precipitation: Option<String>,
    /// Snowfall ("0" when 적설없음)
    pub snow: Option<String>,
    /// Display condition — precipitation type if any, else sky condition
    pub condition: String,
    /// Display icon, same precedence as `condition`
    pub icon: String,
}

fn sky_display(code: &str) -> (&'static str, &'static str) {
    match code {
        "1" => ("맑음", "☀️"),
        "3" => ("구름많음", "⛅"),
        "4" => ("흐림", "☁️"),
        _ => ("알수없음", "❓"),
    }
}

fn pty_display(code: &str) -> (&'static str, &'static str) {
    match code {
        "1" => ("비", "🌧️"),
        "2" => ("비/눈", "🌨️"),
        "3" => ("눈", "❄️"),
        "4" => ("소나기", "🌦️"),
        _ => ("", ""),
    }
}

/// Fold raw rows into time-ordered forecast points.
///
/// Unknown categories are ignored; unparseable numeric values leave the
/// field unset rather than failing the slot.
pub fn parse_forecast_items(items: &[FcstItem]) -> Vec<ForecastPoint> {
    let mut slots: BTreeMap<(String, String), ForecastPoint> = BTreeMap::new();

    for item in items {
        let key = (item.fcst_date.clone(), item.fcst_time.clone());
        let point = slots.entry(key).or_insert_with(|| ForecastPoint {
            date: item.fcst_date.clone(),
            time: item.fcst_time.clone(),
            hour: item
                .fcst_time
                .get(..2)
                .and_then(|h| h.parse().ok())
                .unwrap_or(0),
            ..Default::default()
        });

        match item.category.as_str() {
            "TMP" => point.temperature = item.fcst_value.parse().ok(),
            "SKY" => point.sky = Some(item.fcst_value.clone()),
            "PTY" => point.pty = Some(item.fcst_value.clone()),
            "POP" => point.pop = item.fcst_value.parse().ok(),
            "REH" => point.humidity = item.fcst_value.parse().ok(),
            "WSD" => point.wind_speed = item.fcst_value.parse().ok(),
            "PCP" => {
                point.precipitation = Some(if item.fcst_value == "강수없음" {
                    "0".to_string()
                } else {
                    item.fcst_value.clone()
                })
            }
            "SNO" => {
                point.snow = Some(if item.fcst_value == "적설없음" {
                    "0".to_string()
                } else {
                    item.fcst_value.clone()
                })
            }
            _ => {}
        }
    }

    // BTreeMap keyed by (date, time) is already chronological
    slots
        .into_values()
        .map(|mut point| {
            let (sky_text, sky_icon) = point
                .sky
                .as_deref()
                .map(sky_display)
                .unwrap_or(("알수없음", "❓"));
            let (pty_text, pty_icon) = match point.pty.as_deref() {
                Some(code) if code != "0" => pty_display(code),
                _ => ("", ""),
            };
            // Precipitation wins over sky condition for display
            point.condition = if pty_text.is_empty() { sky_text } else { pty_text }.to_string();
            point.icon = if pty_icon.is_empty() { sky_icon } else { pty_icon }.to_string();
            point
        })
        .collect()
}

/// Compute the most recent retrievable forecast issue (base_date, base_time).
///
/// Runs publish at 02/05/…/23 KST and become retrievable ~10 minutes
/// later. Before 02:10 KST the previous day's 23:00 run is used.
pub fn base_date_time(now: DateTime<Utc>) -> (String, String) {
    let kst = now + Duration::hours(9);
    let mut date = kst.date_naive();
    let mut hour = kst.hour() as i32;
    if kst.minute() < PUBLICATION_DELAY_MIN {
        hour -= 1;
        if hour < 0 {
            hour = 23;
            date -= Duration::days(1);
        }
    }

    let base_hour = if hour < 2 {
        date -= Duration::days(1);
        23
    } else {
        BASE_HOURS
            .iter()
            .rev()
            .find(|&&b| (b as i32) <= hour)
            .copied()
            .unwrap_or(2)
    };

    (
        format!("{:04}{:02}{:02}", date.year(), date.month(), date.day()),
        format!("{:02}00", base_hour),
    )
}

/// The issue time three hours before `base_time` — used to retry when the
/// freshest run has no rows yet.
pub fn previous_base_time(base_time: &str) -> String {
    let t: i32 = base_time.parse().unwrap_or(200);
    format!("{:04}", (t - 300 + 2400) % 2400)
}
