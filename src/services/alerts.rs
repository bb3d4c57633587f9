//! KMA advisory RSS feed normalization.
//!
//! Two feeds are consumed: the life-weather advisory list and the warning
//! (특보) feed. Items carry free-text Korean titles/descriptions, often in
//! CDATA. Normalization extracts a severity class, a short title, and a
//! region guess via ordered keyword rule tables, then the aggregation step
//! sorts primary-region items first, deduplicates and caps the list.

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum number of alerts kept after aggregation.
const MAX_ALERTS: usize = 10;

/// Alerts expire a fixed 24 h after issue; the feeds carry no end time.
const ALERT_TTL_HOURS: i64 = 24;

/// Advisory severity class, ordered most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Danger,
    Warning,
    Watch,
    Info,
}

impl AlertSeverity {
    /// Sort rank: danger < warning < watch < info.
    fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Danger => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Watch => 2,
            AlertSeverity::Info => 3,
        }
    }
}

/// Ordered severity classification rules. First rule whose keyword list
/// matches wins; no match means `Info`.
///
/// 경보 (warning proper) outranks 주의보 (advisory), so it is checked
/// first — "주의보" contains "주의" and would otherwise shadow it.
const SEVERITY_RULES: [(&[&str], AlertSeverity); 3] = [
    (&["경보", "위험", "긴급"], AlertSeverity::Danger),
    (&["주의보", "주의"], AlertSeverity::Warning),
    (&["예비", "관심"], AlertSeverity::Watch),
];

/// Known advisory categories, checked in order for short-title extraction.
/// Compound phrases (폭염경보) precede their bare category (미세먼지).
const KNOWN_PHENOMENA: [&str; 22] = [
    "폭염경보",
    "폭염주의보",
    "한파경보",
    "한파주의보",
    "대설경보",
    "대설주의보",
    "호우경보",
    "호우주의보",
    "강풍경보",
    "강풍주의보",
    "풍랑경보",
    "풍랑주의보",
    "태풍경보",
    "태풍주의보",
    "건조경보",
    "건조주의보",
    "황사경보",
    "황사주의보",
    "초미세먼지",
    "미세먼지",
    "오존",
    "자외선",
];

/// The 17 top-level administrative regions, for region guessing.
const TOP_LEVEL_REGIONS: [&str; 17] = [
    "경기", "서울", "인천", "강원", "충북", "충남", "대전", "세종", "전북", "전남", "광주",
    "경북", "경남", "대구", "울산", "부산", "제주",
];

/// Region guess when no region name appears in the item text.
const NATIONWIDE: &str = "전국";

/// One normalized advisory.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertRecord {
    /// Synthetic id (not stable across polls)
    pub id: Uuid,
    /// Severity class
    pub severity: AlertSeverity,
    /// Short derived title (e.g. "폭염경보")
    pub title: String,
    /// Full message text
    pub message: String,
    /// Region guess (top-level region name or 전국)
    pub region: String,
    /// Publish time from the feed
    pub issued_at: DateTime<Utc>,
    /// Issue time + 24 h (the feeds carry no expiry)
    pub expires_at: DateTime<Utc>,
}

/// Classify severity from free text via the ordered rule table.
pub fn classify_severity(text: &str) -> AlertSeverity {
    for (keywords, severity) in SEVERITY_RULES {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return severity;
        }
    }
    AlertSeverity::Info
}

/// Derive a short title from item text.
///
/// Prefers a known advisory-category phrase; otherwise the text before a
/// colon or opening bracket when one appears within the first 20
/// characters; otherwise the first 15 characters.
pub fn derive_short_title(text: &str) -> String {
    for phenomenon in KNOWN_PHENOMENA {
        if text.contains(phenomenon) {
            return phenomenon.to_string();
        }
    }

    let chars: Vec<char> = text.chars().collect();
    for delimiter in [':', '['] {
        if let Some(idx) = chars.iter().position(|&c| c == delimiter) {
            if idx > 0 && idx < 20 {
                return chars[..idx].iter().collect::<String>().trim().to_string();
            }
        }
    }

    chars.iter().take(15).collect::<String>().trim().to_string()
}

/// Guess the affected region by scanning for a top-level region name.
pub fn extract_region(text: &str) -> &'static str {
    TOP_LEVEL_REGIONS
        .iter()
        .find(|region| text.contains(**region))
        .copied()
        .unwrap_or(NATIONWIDE)
}

/// A raw `<item>` from an RSS feed, before normalization.
#[derive(Debug, Default)]
struct RssItem {
    title: String,
    description: String,
    pub_date: Option<String>,
}

/// Extract `<item>` title/description/pubDate triples from RSS XML.
///
/// Title and description prefer CDATA content, falling back to plain text.
/// Malformed XML terminates the scan with whatever was collected so far —
/// feed errors degrade, they never fail the caller.
fn parse_rss_items(xml: &str) -> Vec<RssItem> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();

    let mut in_item = false;
    let mut current: RssItem = RssItem::default();
    // (element name, plain text, cdata text) for the field being read
    let mut current_element: Option<String> = None;
    let mut plain = String::new();
    let mut cdata = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local.as_str() {
                    "item" => {
                        in_item = true;
                        current = RssItem::default();
                    }
                    "title" | "description" | "pubDate" if in_item => {
                        current_element = Some(local);
                        plain.clear();
                        cdata.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if current_element.is_some() {
                    plain.push_str(e.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::CData(ref e)) => {
                if current_element.is_some() {
                    cdata.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(ref e)) => {
                let local = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if let Some(elem) = current_element.take() {
                    if elem == local {
                        let text = if cdata.trim().is_empty() {
                            plain.trim().to_string()
                        } else {
                            cdata.trim().to_string()
                        };
                        match elem.as_str() {
                            "title" => current.title = text,
                            "description" => current.description = text,
                            "pubDate" => current.pub_date = Some(text),
                            _ => {}
                        }
                    }
                }
                if local == "item" && in_item {
                    in_item = false;
                    items.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("Malformed RSS feed, stopping at parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    items
}

/// Normalize an RSS feed into alert records.
///
/// `skip_agency_items` drops items whose title mentions 기상청 — the
/// warning feed interleaves self-referential agency notices.
pub fn normalize_feed(xml: &str, skip_agency_items: bool, now: DateTime<Utc>) -> Vec<AlertRecord> {
    parse_rss_items(xml)
        .into_iter()
        .filter(|item| !item.title.is_empty())
        .filter(|item| !(skip_agency_items && item.title.contains("기상청")))
        .map(|item| {
            let issued_at = item
                .pub_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now);
            let combined = format!("{} {}", item.title, item.description);
            AlertRecord {
                id: Uuid::new_v4(),
                severity: classify_severity(&item.title),
                title: derive_short_title(&item.title),
                message: if item.description.is_empty() {
                    item.title.clone()
                } else {
                    item.description.clone()
                },
                region: extract_region(&combined).to_string(),
                issued_at,
                expires_at: issued_at + Duration::hours(ALERT_TTL_HOURS),
            }
        })
        .collect()
}

/// Default informational alert policy, used when no advisories are active.
///
/// Injected rather than hardcoded so the empty-list branch is testable.
#[derive(Debug, Clone)]
pub struct DefaultAlertPolicy {
    /// Region label shown on default messages (e.g. "경기도")
    pub region_label: String,
}

impl DefaultAlertPolicy {
    /// Build the time-of-day default message for a given KST hour.
    pub fn default_alerts(&self, now: DateTime<Utc>, kst_hour: u32) -> Vec<AlertRecord> {
        let (title, message, ttl_hours) = if (6..12).contains(&kst_hour) {
            (
                "오늘의 날씨",
                "오늘 날씨 정보를 확인하세요. 지역을 클릭하면 상세 정보를 볼 수 있습니다.",
                6,
            )
        } else if (12..18).contains(&kst_hour) {
            (
                "오후 날씨",
                "오후 날씨 현황입니다. 외출 시 날씨 변화에 유의하세요.",
                6,
            )
        } else {
            (
                "야간 날씨",
                "야간 기온 변화에 유의하세요. 내일 날씨도 미리 확인하세요.",
                12,
            )
        };

        vec![AlertRecord {
            id: Uuid::new_v4(),
            severity: AlertSeverity::Info,
            title: title.to_string(),
            message: format!("{} {}", self.region_label, message),
            region: self.region_label.clone(),
            issued_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        }]
    }
}

/// Aggregate alerts from all feeds: primary region first (severity as
/// tiebreak), deduplicate by (title, region) keeping the first occurrence,
/// cap the list, and substitute the default message when empty.
pub fn finalize_alerts(
    mut alerts: Vec<AlertRecord>,
    primary_region: &str,
    now: DateTime<Utc>,
    kst_hour: u32,
    policy: &DefaultAlertPolicy,
) -> Vec<AlertRecord> {
    alerts.sort_by(|a, b| {
        let a_primary = mentions_region(a, primary_region);
        let b_primary = mentions_region(b, primary_region);
        b_primary
            .cmp(&a_primary)
            .then(a.severity.rank().cmp(&b.severity.rank()))
    });

    let mut seen = std::collections::HashSet::new();
    alerts.retain(|alert| seen.insert((alert.title.clone(), alert.region.clone())));
    alerts.truncate(MAX_ALERTS);

    if alerts.is_empty() {
        return policy.default_alerts(now, kst_hour);
    }
    alerts
}

fn mentions_region(alert: &AlertRecord, region: &str) -> bool {
    alert.region.contains(region) || alert.message.contains(region)
}
