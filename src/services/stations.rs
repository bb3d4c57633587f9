//! Static municipality → observation station mapping for Gyeonggi province.
//!
//! The KMA surface observation network does not have a station in every
//! municipality, so several municipalities resolve to the nearest station
//! (e.g. 성남시 uses the 수원 station). The mapping also carries the
//! coordinates used for map rendering, the village-forecast grid cell and
//! the administrative district code.

use serde::Serialize;
use utoipa::ToSchema;

/// One municipality of Gyeonggi province with its resolved observation
/// station and forecast grid cell.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Region {
    /// Municipality name (e.g. "수원시")
    pub name: &'static str,
    /// Administrative district code
    pub code: &'static str,
    /// KMA surface observation station id
    pub station_id: i32,
    /// Display name of the observation station
    pub station_name: &'static str,
    /// Substitution note when the station is not collocated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_note: Option<&'static str>,
    /// Latitude (WGS84)
    pub lat: f64,
    /// Longitude (WGS84)
    pub lng: f64,
    /// Village forecast grid X
    pub nx: i32,
    /// Village forecast grid Y
    pub ny: i32,
}

const fn region(
    name: &'static str,
    code: &'static str,
    station_id: i32,
    station_name: &'static str,
    station_note: Option<&'static str>,
    lat: f64,
    lng: f64,
    nx: i32,
    ny: i32,
) -> Region {
    Region {
        name,
        code,
        station_id,
        station_name,
        station_note,
        lat,
        lng,
        nx,
        ny,
    }
}

const NEAREST: Option<&str> = Some("가장 가까운 관측소 사용");

/// The 31 municipalities of Gyeonggi province.
///
/// Station ids: 수원 119, 인천 112, 서울 108, 파주 99, 동두천 98,
/// 이천 203, 양평 202, 춘천 101.
pub static GYEONGGI_REGIONS: [Region; 31] = [
    region("수원시", "41110", 119, "수원", None, 37.2636, 127.0286, 60, 121),
    region("성남시", "41130", 119, "수원", NEAREST, 37.4449, 127.1389, 63, 124),
    region("의정부시", "41150", 98, "동두천", NEAREST, 37.7381, 127.0337, 61, 130),
    region("안양시", "41170", 119, "수원", NEAREST, 37.3943, 126.9568, 59, 123),
    region("부천시", "41190", 112, "인천", NEAREST, 37.5034, 126.7660, 56, 125),
    region("광명시", "41210", 112, "인천", NEAREST, 37.4786, 126.8644, 58, 125),
    region("평택시", "41220", 119, "수원", NEAREST, 36.9921, 127.1127, 62, 114),
    region("동두천시", "41230", 98, "동두천", None, 37.9035, 127.0605, 61, 134),
    region("안산시", "41270", 112, "인천", NEAREST, 37.3219, 126.8309, 53, 121),
    region("고양시", "41280", 99, "파주", NEAREST, 37.6584, 126.8320, 57, 128),
    region("과천시", "41290", 108, "서울", NEAREST, 37.4292, 126.9876, 60, 124),
    region("구리시", "41310", 108, "서울", NEAREST, 37.5943, 127.1295, 62, 127),
    region("남양주시", "41360", 202, "양평", NEAREST, 37.6360, 127.2165, 64, 128),
    region("오산시", "41370", 119, "수원", NEAREST, 37.1498, 127.0775, 62, 118),
    region("시흥시", "41390", 112, "인천", NEAREST, 37.3800, 126.8029, 55, 122),
    region("군포시", "41410", 119, "수원", NEAREST, 37.3617, 126.9352, 59, 122),
    region("의왕시", "41430", 119, "수원", NEAREST, 37.3449, 126.9683, 60, 122),
    region("하남시", "41450", 108, "서울", NEAREST, 37.5393, 127.2148, 64, 126),
    region("용인시", "41460", 203, "이천", NEAREST, 37.2411, 127.1776, 64, 119),
    region("파주시", "41480", 99, "파주", None, 37.7600, 126.7800, 56, 131),
    region("이천시", "41500", 203, "이천", None, 37.2720, 127.4350, 68, 121),
    region("안성시", "41550", 119, "수원", NEAREST, 37.0080, 127.2797, 65, 115),
    region("김포시", "41570", 112, "인천", NEAREST, 37.6152, 126.7156, 55, 128),
    region("화성시", "41590", 119, "수원", NEAREST, 37.1996, 126.8312, 57, 119),
    region("광주시", "41610", 203, "이천", NEAREST, 37.4095, 127.2550, 65, 123),
    region("양주시", "41630", 98, "동두천", NEAREST, 37.7853, 127.0458, 61, 131),
    region("포천시", "41650", 98, "동두천", NEAREST, 37.8949, 127.2002, 64, 134),
    region("여주시", "41670", 203, "이천", NEAREST, 37.2983, 127.6374, 71, 121),
    region("연천군", "41800", 98, "동두천", NEAREST, 38.0966, 127.0750, 61, 138),
    region("가평군", "41820", 101, "춘천", NEAREST, 37.8315, 127.5095, 69, 133),
    region("양평군", "41830", 202, "양평", None, 37.4917, 127.4872, 69, 125),
];

/// Resolve a municipality name to its region entry.
///
/// Pure lookup over the fixed 31-entry set — no fuzzy matching, no
/// fallback. Callers must handle `None` explicitly (the API layer turns
/// it into a 404 naming the unknown region).
pub fn resolve_region(name: &str) -> Option<&'static Region> {
    GYEONGGI_REGIONS.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_31_municipalities_present() {
        assert_eq!(GYEONGGI_REGIONS.len(), 31);
        let names: HashSet<_> = GYEONGGI_REGIONS.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), 31, "municipality names must be unique");
    }

    #[test]
    fn test_resolve_collocated_station() {
        let suwon = resolve_region("수원시").unwrap();
        assert_eq!(suwon.station_id, 119);
        assert_eq!(suwon.station_name, "수원");
        assert!(suwon.station_note.is_none());
    }

    #[test]
    fn test_resolve_substituted_station() {
        let seongnam = resolve_region("성남시").unwrap();
        assert_eq!(seongnam.station_id, 119);
        assert_eq!(seongnam.station_name, "수원");
        assert!(seongnam.station_note.is_some());
    }

    #[test]
    fn test_resolve_unknown_region() {
        assert!(resolve_region("부산시").is_none());
        assert!(resolve_region("").is_none());
    }

    #[test]
    fn test_shared_stations() {
        // Many municipalities share a nearest station
        let on_suwon = GYEONGGI_REGIONS
            .iter()
            .filter(|r| r.station_id == 119)
            .count();
        assert!(on_suwon > 1);
    }

    #[test]
    fn test_admin_codes_are_gyeonggi() {
        for r in &GYEONGGI_REGIONS {
            assert!(r.code.starts_with("41"), "{} has code {}", r.name, r.code);
        }
    }
}
