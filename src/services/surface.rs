//! Parser for KMA API Hub `typ01` surface observation responses.
//!
//! The API Hub returns space-delimited fixed-column text, e.g.
//!
//! ```text
//! #START7777
//! # TM       STN  WD  WS ...
//! 202501061200 119 320 2.1 ... -9 ...
//! #7777END
//! ```
//!
//! Fields are matched to a fixed column schema by position. The sentinel
//! strings `-9`, `-99.0` and `-9.0` mark missing values. A line with fewer
//! fields than the schema leaves the trailing columns unset (absent, which
//! callers observe the same way as a sentinel: `None`).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

/// Start/end markers wrapped around every typ01 response body.
const START_MARKER: &str = "START7777";
const END_MARKER: &str = "END7777";

/// Sentinel strings the API Hub uses for missing values.
const MISSING_SENTINELS: [&str; 3] = ["-9", "-99.0", "-9.0"];

/// Column schema for hourly surface observations (`kma_sfctm2` single
/// timestamp and `kma_sfctm3` time range share this layout).
pub const SFCTM_COLUMNS: [&str; 46] = [
    "TM", "STN", "WD", "WS", "GST_WD", "GST_WS", "GST_TM", "PA", "PS", "PT", "PR", "TA", "TD",
    "HM", "PV", "RN", "RN_DAY", "RN_JUN", "RN_INT", "SD_HR3", "SD_DAY", "SD_TOT", "WC", "WP",
    "WW", "CA_TOT", "CA_MID", "CH_MIN", "CT", "CT_TOP", "CT_MID", "CT_LOW", "VS", "SS", "SI",
    "ST_GD", "TS", "TE_005", "TE_01", "TE_02", "TE_03", "ST_SEA", "WH", "BF", "IR", "IX",
];

/// Column schema for daily surface summaries (`kma_sfcdd`).
pub const SFCDD_COLUMNS: [&str; 47] = [
    "TM", "STN", "TA_AVG", "TA_MAX", "TA_MAX_TM", "TA_MIN", "TA_MIN_TM", "HM_AVG", "HM_MIN",
    "HM_MIN_TM", "WS_AVG", "WS_MAX", "WS_MAX_TM", "WS_MAX_DIR", "WS_INS", "WS_INS_TM",
    "WS_INS_DIR", "RN_DAY", "RN_D99", "RN_DUR", "RN_60M", "RN_60M_TM", "RN_10M", "RN_10M_TM",
    "SD_NEW", "SD_NEW_TM", "SD_MAX", "SD_MAX_TM", "SS_DAY", "SS_CMB", "SI_DAY", "SI_60M",
    "SI_60M_TM", "TS_AVG", "TS_MAX", "TS_MAX_TM", "TS_MIN", "TS_MIN_TM", "TE_AVG", "TE_MAX",
    "TE_MAX_TM", "TE_MIN", "TE_MIN_TM", "EV_S", "EV_L", "CA_TOT", "CA_MID",
];

/// Column schema for monthly surface summaries (`kma_sfcmm`).
pub const SFCMM_COLUMNS: [&str; 27] = [
    "TM", "STN", "TA_AVG", "TA_AVG_MAX", "TA_AVG_MIN", "TA_MAX", "TA_MAX_TM", "TA_MIN",
    "TA_MIN_TM", "HM_AVG", "WS_AVG", "WS_MAX", "WS_MAX_TM", "WS_MAX_DIR", "RN_MON", "RN_DAY_MAX",
    "RN_DAY_MAX_TM", "RN_1HR_MAX", "RN_1HR_MAX_TM", "SD_NEW_MAX", "SD_NEW_MAX_TM", "SD_MAX",
    "SD_MAX_TM", "SS_MON", "SI_MON", "CA_TOT", "CA_MID",
];

/// One parsed field value.
///
/// Numeric tokens become `Number`, the missing-value sentinels become
/// `Missing` (serialized as JSON null), anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Number(f64),
    Text(String),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Missing => serializer.serialize_none(),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One observation line, as ordered (column, value) pairs.
///
/// Kept as a vector rather than a map so that JSON output preserves the
/// upstream column order. Lookup is a linear scan over at most ~50 entries.
#[derive(Debug, Clone)]
pub struct SurfaceRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Serialize for SurfaceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (col, value) in &self.fields {
            map.serialize_entry(col, value)?;
        }
        map.end()
    }
}

impl SurfaceRecord {
    /// Raw field value for a column. `None` when the line was short.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(col, _)| *col == column)
            .map(|(_, value)| value)
    }

    /// Numeric value for a column. `None` for missing, absent or
    /// non-numeric fields.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.get(column) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Station id, when present. Station codes are small integers.
    pub fn station_id(&self) -> Option<i32> {
        self.number("STN").map(|n| n as i32)
    }

    /// Observation timestamp as the upstream `YYYYMMDDHHMM` string.
    pub fn timestamp(&self) -> Option<String> {
        match self.get("TM") {
            Some(FieldValue::Number(n)) => Some(format!("{:.0}", n)),
            Some(FieldValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Parse a single field token: sentinel → `Missing`, numeric → `Number`,
/// anything else verbatim.
fn parse_field(token: &str) -> FieldValue {
    if MISSING_SENTINELS.contains(&token) {
        return FieldValue::Missing;
    }
    match token.parse::<f64>() {
        Ok(n) => FieldValue::Number(n),
        Err(_) => FieldValue::Text(token.to_string()),
    }
}

/// Parse a typ01 text response against a column schema.
///
/// Blank lines, `#`-prefixed comment lines and the `START7777`/`END7777`
/// markers are dropped; every remaining line yields one record. Fields
/// beyond the schema length are ignored.
pub fn parse_telemetry(text: &str, columns: &[&'static str]) -> Vec<SurfaceRecord> {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with('#')
                && !trimmed.contains(START_MARKER)
                && !trimmed.contains(END_MARKER)
        })
        .map(|line| {
            let fields = line
                .split_whitespace()
                .zip(columns.iter())
                .map(|(token, col)| (*col, parse_field(token)))
                .collect();
            SurfaceRecord { fields }
        })
        .collect()
}

/// One typed hourly observation, extracted from a [`SurfaceRecord`].
///
/// Every measurement is optional — a sentinel in the raw line or a short
/// line both surface as `None`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObservationRecord {
    /// Municipality the observation is resolved for
    pub region: String,
    /// Observation station display name
    pub station: String,
    /// Observation timestamp (`YYYYMMDDHHMM`, KST)
    pub datetime: Option<String>,
    /// Air temperature (°C)
    pub temperature: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Wind speed (m/s)
    pub wind_speed: Option<f64>,
    /// Wind direction (deg)
    pub wind_direction: Option<f64>,
    /// Sea-level pressure (hPa)
    pub pressure: Option<f64>,
    /// Precipitation since 00 KST (mm)
    pub precipitation: Option<f64>,
    /// Visibility (10 m units)
    pub visibility: Option<f64>,
    /// Total cloud cover (tenths)
    pub cloud_cover: Option<f64>,
}

impl ObservationRecord {
    /// Build a typed observation from a parsed hourly record.
    pub fn from_record(region: &str, station: &str, record: &SurfaceRecord) -> Self {
        Self {
            region: region.to_string(),
            station: station.to_string(),
            datetime: record.timestamp(),
            temperature: record.number("TA"),
            humidity: record.number("HM"),
            wind_speed: record.number("WS"),
            wind_direction: record.number("WD"),
            pressure: record.number("PS"),
            precipitation: record.number("RN_DAY"),
            visibility: record.number("VS"),
            cloud_cover: record.number("CA_TOT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The worked example from the KMA API Hub docs: 47 tokens against the
    // 46-column hourly schema (the extra trailing token is ignored).
    const SAMPLE_LINE: &str = "20250106120000 119 320 2.1 -9 -9 -9 1013.2 1012.0 -9 -9 18.5 12.3 65 -9 0.0 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 2000 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 -9 =";

    #[test]
    fn test_sentinels_parse_as_missing() {
        for sentinel in ["-9", "-99.0", "-9.0"] {
            assert_eq!(parse_field(sentinel), FieldValue::Missing);
        }
    }

    #[test]
    fn test_numeric_tokens_parse_as_numbers() {
        assert_eq!(parse_field("18.5"), FieldValue::Number(18.5));
        assert_eq!(parse_field("-3.2"), FieldValue::Number(-3.2));
        assert_eq!(parse_field("0"), FieldValue::Number(0.0));
        // Near-sentinel values are real measurements
        assert_eq!(parse_field("-9.1"), FieldValue::Number(-9.1));
        assert_eq!(parse_field("-99"), FieldValue::Number(-99.0));
    }

    #[test]
    fn test_non_numeric_tokens_kept_verbatim() {
        assert_eq!(parse_field("="), FieldValue::Text("=".to_string()));
    }

    #[test]
    fn test_sample_line_token_alignment() {
        // 46 data tokens + the trailing `=` terminator
        let tokens: Vec<&str> = SAMPLE_LINE.split_whitespace().collect();
        assert_eq!(tokens.len(), 47);
        assert_eq!(SFCTM_COLUMNS[32], "VS");
        assert_eq!(tokens[32], "2000");
    }

    #[test]
    fn test_parse_sample_line() {
        let records = parse_telemetry(SAMPLE_LINE, &SFCTM_COLUMNS);
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.number("TA"), Some(18.5));
        assert_eq!(rec.number("HM"), Some(65.0));
        assert_eq!(rec.number("VS"), Some(2000.0));
        assert_eq!(rec.get("GST_WD"), Some(&FieldValue::Missing));
        assert_eq!(rec.station_id(), Some(119));
    }

    #[test]
    fn test_comments_and_markers_dropped() {
        let text = format!(
            "#START7777\n# TM STN WD\n\n{}\n#7777END\n",
            SAMPLE_LINE
        );
        let records = parse_telemetry(&text, &SFCTM_COLUMNS);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_short_line_leaves_trailing_columns_unset() {
        let records = parse_telemetry("202501061200 119 320", &SFCTM_COLUMNS);
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.number("WD"), Some(320.0));
        // TA was never present — absent, not Missing
        assert!(rec.get("TA").is_none());
        assert_eq!(rec.number("TA"), None);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut line = SAMPLE_LINE.to_string();
        line.push_str(" 42 43 44");
        let records = parse_telemetry(&line, &SFCTM_COLUMNS);
        assert_eq!(records[0].fields.len(), 46);
    }

    #[test]
    fn test_multiple_lines_yield_ordered_records() {
        let text = "202501061100 108 270 3.0\n202501061200 119 320 2.1\n";
        let records = parse_telemetry(text, &SFCTM_COLUMNS);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].station_id(), Some(108));
        assert_eq!(records[1].station_id(), Some(119));
    }

    #[test]
    fn test_observation_record_from_sample() {
        let records = parse_telemetry(SAMPLE_LINE, &SFCTM_COLUMNS);
        let obs = ObservationRecord::from_record("수원시", "수원", &records[0]);
        assert_eq!(obs.temperature, Some(18.5));
        assert_eq!(obs.humidity, Some(65.0));
        assert_eq!(obs.visibility, Some(2000.0));
        assert_eq!(obs.pressure, Some(1012.0));
        assert_eq!(obs.wind_direction, Some(320.0));
        assert_eq!(obs.wind_speed, Some(2.1));
        assert_eq!(obs.datetime.as_deref(), Some("20250106120000"));
    }

    #[test]
    fn test_serialized_record_preserves_column_order() {
        let records = parse_telemetry(SAMPLE_LINE, &SFCTM_COLUMNS);
        let json = serde_json::to_string(&records[0]).unwrap();
        let tm = json.find("\"TM\"").unwrap();
        let stn = json.find("\"STN\"").unwrap();
        let ta = json.find("\"TA\"").unwrap();
        assert!(tm < stn && stn < ta);
        // Sentinel serializes as null
        assert!(json.contains("\"GST_WD\":null"));
    }

    #[test]
    fn test_daily_and_monthly_schemas() {
        let daily = parse_telemetry("20250106 119 3.2 8.1", &SFCDD_COLUMNS);
        assert_eq!(daily[0].number("TA_AVG"), Some(3.2));
        let monthly = parse_telemetry("202501 119 -2.1 2.0 -6.5", &SFCMM_COLUMNS);
        assert_eq!(monthly[0].number("TA_AVG"), Some(-2.1));
        assert_eq!(monthly[0].number("TA_AVG_MIN"), Some(-6.5));
    }
}
