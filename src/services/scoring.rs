//! Climate comfort scoring.
//!
//! Combines weighted climate variables into a bounded 0–100 risk score with
//! a four-tier classification, plus the per-audience adjustment used for
//! vulnerable groups. Higher scores mean worse conditions.
//!
//! Weights: apparent temperature 40%, PM10 20%, PM2.5 15%, humidity 10%,
//! UV index 10%, surface temperature 5%.

use serde::Serialize;
use utoipa::ToSchema;

/// Score thresholds for the risk tiers.
pub const DANGER_THRESHOLD: u8 = 75;
pub const WARNING_THRESHOLD: u8 = 50;
pub const CAUTION_THRESHOLD: u8 = 30;

/// Risk tier for a 0–100 climate comfort score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Caution,
    Warning,
    Danger,
}

impl RiskLevel {
    /// Classify a score. The tiers partition [0, 100]: ≥75 danger,
    /// ≥50 warning, ≥30 caution, else safe.
    pub fn from_score(score: u8) -> Self {
        if score >= DANGER_THRESHOLD {
            RiskLevel::Danger
        } else if score >= WARNING_THRESHOLD {
            RiskLevel::Warning
        } else if score >= CAUTION_THRESHOLD {
            RiskLevel::Caution
        } else {
            RiskLevel::Safe
        }
    }

    /// Korean display label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "안전",
            RiskLevel::Caution => "주의",
            RiskLevel::Warning => "경고",
            RiskLevel::Danger => "위험",
        }
    }

    /// Map display color.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "#2196F3",
            RiskLevel::Caution => "#FFEB3B",
            RiskLevel::Warning => "#FF9800",
            RiskLevel::Danger => "#F44336",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "🔵",
            RiskLevel::Caution => "🟡",
            RiskLevel::Warning => "🟠",
            RiskLevel::Danger => "🔴",
        }
    }
}

/// Audience group for score adjustment. Vulnerable groups see a higher
/// score for the same conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetGroup {
    Elderly,
    Child,
    Outdoor,
    General,
}

impl TargetGroup {
    /// Parse an audience key. Unknown keys fall back to `General`
    /// (identity multiplier).
    pub fn from_key(key: &str) -> Self {
        match key {
            "elderly" => TargetGroup::Elderly,
            "child" => TargetGroup::Child,
            "outdoor" => TargetGroup::Outdoor,
            _ => TargetGroup::General,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            TargetGroup::Elderly => 1.30,
            TargetGroup::Child => 1.25,
            TargetGroup::Outdoor => 1.20,
            TargetGroup::General => 1.00,
        }
    }

    /// Korean display label.
    pub fn label(&self) -> &'static str {
        match self {
            TargetGroup::Elderly => "노인",
            TargetGroup::Child => "아동",
            TargetGroup::Outdoor => "야외근로자",
            TargetGroup::General => "일반 시민",
        }
    }
}

/// Adjust a base score for an audience group:
/// `min(100, round(base × multiplier))`.
pub fn adjust_score_for_target(base_score: u8, target: TargetGroup) -> u8 {
    let adjusted = (f64::from(base_score) * target.multiplier()).round();
    adjusted.min(100.0) as u8
}

/// Raw climate variables feeding the scorer. Any may be absent; the
/// curves substitute moderate defaults for missing inputs.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ClimateInputs {
    /// Air temperature (°C)
    pub temperature: Option<f64>,
    /// Apparent (feels-like) temperature (°C)
    pub apparent_temperature: Option<f64>,
    /// PM10 (µg/m³)
    pub pm10: Option<f64>,
    /// PM2.5 (µg/m³)
    pub pm25: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// UV index (0–11+)
    pub uv_index: Option<f64>,
    /// Surface (ground) temperature (°C)
    pub surface_temperature: Option<f64>,
}

// Per-variable sub-score curves. Each maps a raw value to its weighted
// contribution, capped at the variable's weight share of 100.

fn apparent_temp_score(t: f64) -> f64 {
    let s = if t >= 41.0 {
        40.0
    } else if t >= 35.0 {
        30.0 + (t - 35.0) * 1.67
    } else if t >= 31.0 {
        20.0 + (t - 31.0) * 2.5
    } else if t >= 27.0 {
        10.0 + (t - 27.0) * 2.5
    } else {
        (t - 17.0).max(0.0)
    };
    s.min(40.0)
}

fn pm10_score(v: f64) -> f64 {
    let s = if v >= 151.0 {
        20.0
    } else if v >= 81.0 {
        15.0 + (v - 81.0) * 0.07
    } else if v >= 31.0 {
        5.0 + (v - 31.0) * 0.2
    } else {
        v / 6.0
    };
    s.min(20.0)
}

fn pm25_score(v: f64) -> f64 {
    let s = if v >= 76.0 {
        15.0
    } else if v >= 36.0 {
        10.0 + (v - 36.0) * 0.125
    } else if v >= 16.0 {
        5.0 + (v - 16.0) * 0.25
    } else {
        v / 3.0
    };
    s.min(15.0)
}

// Humidity is uncomfortable at both extremes.
fn humidity_score(v: f64) -> f64 {
    if v >= 80.0 || v <= 20.0 {
        10.0
    } else if v >= 70.0 || v <= 30.0 {
        6.0
    } else if v >= 60.0 || v <= 40.0 {
        3.0
    } else {
        0.0
    }
}

fn uv_score(v: f64) -> f64 {
    let s = if v >= 11.0 {
        10.0
    } else if v >= 8.0 {
        7.0 + (v - 8.0)
    } else if v >= 6.0 {
        4.0 + (v - 6.0) * 1.5
    } else if v >= 3.0 {
        (v - 3.0) * 1.33
    } else {
        0.0
    };
    s.min(10.0)
}

// Surface heating above air temperature (radiant load).
fn surface_delta_score(delta: f64) -> f64 {
    if delta >= 15.0 {
        5.0
    } else if delta >= 10.0 {
        3.0
    } else if delta >= 5.0 {
        1.0
    } else {
        0.0
    }
}

/// Compute the 0–100 climate comfort score and its risk tier.
pub fn calculate_climate_score(inputs: &ClimateInputs) -> (u8, RiskLevel) {
    let air_temp = inputs.temperature.unwrap_or(25.0);
    let apparent = inputs.apparent_temperature.unwrap_or(air_temp);

    let mut score = apparent_temp_score(apparent);
    score += pm10_score(inputs.pm10.unwrap_or(30.0));
    score += pm25_score(inputs.pm25.unwrap_or(15.0));
    score += humidity_score(inputs.humidity.unwrap_or(50.0));
    score += uv_score(inputs.uv_index.unwrap_or(6.0));

    let surface = inputs.surface_temperature.unwrap_or(air_temp + 5.0);
    score += surface_delta_score(surface - air_temp);

    let final_score = score.clamp(0.0, 100.0) as u8;
    (final_score, RiskLevel::from_score(final_score))
}

/// Apparent temperature from air temperature, humidity and wind.
///
/// Summer (TA ≥ 27 with humidity): simplified heat index.
/// Winter (TA ≤ 10 with wind): wind chill (wind converted to km/h).
/// Otherwise the air temperature itself. Rounded to 0.1 °C.
pub fn apparent_temperature(
    temperature: f64,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
) -> f64 {
    let t = temperature;
    let apparent = if t >= 27.0 {
        match humidity {
            Some(hm) => {
                t + 0.33 * (hm / 100.0 * 6.105 * (17.27 * t / (237.7 + t)).exp()) - 4.0
            }
            None => t,
        }
    } else if t <= 10.0 {
        match wind_speed {
            Some(ws) if ws > 0.0 => {
                let v = (ws * 3.6).powf(0.16);
                13.12 + 0.6215 * t - 11.37 * v + 0.3965 * t * v
            }
            _ => t,
        }
    } else {
        t
    };
    (apparent * 10.0).round() / 10.0
}

/// Estimate PM10/PM2.5 (µg/m³) from visibility (10 m units).
///
/// The surface network has no particulate sensors; low visibility is used
/// as a proxy. Defaults to a moderate (30, 15) when visibility is unknown.
pub fn estimate_pm_from_visibility(visibility: Option<f64>) -> (f64, f64) {
    match visibility {
        Some(vs) if vs <= 100.0 => (150.0, 80.0),
        Some(vs) if vs <= 200.0 => (100.0, 50.0),
        Some(vs) if vs <= 500.0 => (70.0, 35.0),
        Some(vs) if vs <= 1000.0 => (50.0, 25.0),
        Some(vs) if vs <= 2000.0 => (40.0, 20.0),
        _ => (30.0, 15.0),
    }
}

/// Estimate the UV index from solar radiation (MJ/m²), falling back to a
/// time-of-day heuristic when no radiation reading is available.
pub fn estimate_uv_index(solar_radiation: Option<f64>, hour: u32) -> f64 {
    match solar_radiation {
        Some(si) if si > 0.0 => (si * 3.0).round().min(11.0),
        _ => {
            if (11..=14).contains(&hour) {
                6.0
            } else if (9..=16).contains(&hour) {
                4.0
            } else if (7..=18).contains(&hour) {
                2.0
            } else {
                0.0
            }
        }
    }
}
