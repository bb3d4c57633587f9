//! Background poller for advisory feeds.
//!
//! Polls the two KMA RSS feeds on a fixed interval and keeps the finalized
//! alert list in memory so the alerts endpoint serves from cache instead of
//! hitting the feeds per request.
//!
//! Architecture:
//! - Fetches both feeds concurrently each cycle
//! - A failed feed degrades to an empty contribution; if every feed fails,
//!   the previous alert list is kept and the cycle is recorded as an error
//! - State is in-memory (`Arc<RwLock<AlertPollerState>>`), rebuilt on the
//!   first cycle after restart

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::services::alerts::{finalize_alerts, normalize_feed, AlertRecord, DefaultAlertPolicy};
use crate::services::kma::{KmaClient, LIFE_FEED_URL, WARNING_FEED_URL};

/// Seconds between poll cycles.
const POLL_INTERVAL_SECS: u64 = 600;

/// Shortened sleep after a cycle where every feed failed.
const ERROR_RETRY_SECS: u64 = 120;

/// Global poller state, exposed via the status endpoint. The cached
/// alert list lives here as well.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertPollerState {
    pub active: bool,
    pub last_poll_completed_at: Option<DateTime<Utc>>,
    pub last_poll_duration_ms: Option<u64>,
    pub total_polls: u64,
    /// "ok", "error: ...", or "pending" before the first cycle
    pub last_poll_result: String,
    pub alert_count: usize,
    #[serde(skip)]
    pub alerts: Vec<AlertRecord>,
}

impl AlertPollerState {
    pub fn new() -> Self {
        Self {
            active: true,
            last_poll_completed_at: None,
            last_poll_duration_ms: None,
            total_polls: 0,
            last_poll_result: "pending".to_string(),
            alert_count: 0,
            alerts: Vec::new(),
        }
    }
}

impl Default for AlertPollerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared poller state handle.
pub type SharedAlertState = Arc<RwLock<AlertPollerState>>;

/// Hour of day in KST for a UTC instant.
pub fn kst_hour(now: DateTime<Utc>) -> u32 {
    (now + Duration::hours(9)).hour()
}

/// Normalize both feed payloads into one combined alert list.
///
/// `None` marks a feed that could not be fetched this cycle. The warning
/// feed interleaves agency self-notices, which are dropped there.
pub fn collect_feed_alerts(
    life_xml: Option<&str>,
    warning_xml: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<AlertRecord> {
    let mut alerts = Vec::new();
    if let Some(xml) = life_xml {
        alerts.extend(normalize_feed(xml, false, now));
    }
    if let Some(xml) = warning_xml {
        alerts.extend(normalize_feed(xml, true, now));
    }
    alerts
}

/// Fetch both feeds and produce the finalized alert list.
///
/// Returns `None` when every feed failed — the caller keeps its previous
/// list in that case.
pub async fn poll_once(
    client: &KmaClient,
    life_feed_url: &str,
    warning_feed_url: &str,
    primary_region: &str,
    policy: &DefaultAlertPolicy,
    now: DateTime<Utc>,
) -> Option<Vec<AlertRecord>> {
    let (life, warning) = tokio::join!(
        client.fetch_feed(life_feed_url),
        client.fetch_feed(warning_feed_url),
    );

    let life_xml = match life {
        Ok(xml) => Some(xml),
        Err(e) => {
            tracing::warn!("Poller: life-weather feed fetch failed: {}", e);
            None
        }
    };
    let warning_xml = match warning {
        Ok(xml) => Some(xml),
        Err(e) => {
            tracing::warn!("Poller: warning feed fetch failed: {}", e);
            None
        }
    };

    if life_xml.is_none() && warning_xml.is_none() {
        return None;
    }

    let alerts = collect_feed_alerts(life_xml.as_deref(), warning_xml.as_deref(), now);
    Some(finalize_alerts(
        alerts,
        primary_region,
        now,
        kst_hour(now),
        policy,
    ))
}

/// Run the background poller. This function never returns (runs until
/// process exit). Should be spawned via `tokio::spawn(run_poller(...))`.
pub async fn run_poller(
    client: KmaClient,
    primary_region: String,
    policy: DefaultAlertPolicy,
    state: SharedAlertState,
) {
    tracing::info!("Background alert poller started");

    loop {
        let poll_start = Utc::now();
        let result = poll_once(
            &client,
            LIFE_FEED_URL,
            WARNING_FEED_URL,
            &primary_region,
            &policy,
            poll_start,
        )
        .await;
        let poll_duration_ms = (Utc::now() - poll_start).num_milliseconds().max(0) as u64;

        let sleep_secs = {
            let mut s = state.write().await;
            s.last_poll_completed_at = Some(Utc::now());
            s.last_poll_duration_ms = Some(poll_duration_ms);
            s.total_polls += 1;
            match result {
                Some(alerts) => {
                    s.alert_count = alerts.len();
                    s.alerts = alerts;
                    s.last_poll_result = "ok".to_string();
                    POLL_INTERVAL_SECS
                }
                None => {
                    s.last_poll_result = "error: all advisory feeds failed".to_string();
                    ERROR_RETRY_SECS
                }
            }
        };

        tracing::debug!(
            "Poller: cycle complete in {}ms, sleeping {}s",
            poll_duration_ms,
            sleep_secs,
        );
        tokio::time::sleep(std::time::Duration::from_secs(sleep_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIFE_FEED: &str = r#"<rss><channel><item>
        <title>자외선 정보</title>
        <description>수도권 자외선 높음</description>
    </item></channel></rss>"#;

    const WARNING_FEED: &str = r#"<rss><channel>
        <item><title>기상청 발표 안내</title><description>x</description></item>
        <item><title>호우주의보 : 경기</title><description>경기 남부</description></item>
    </channel></rss>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 20, 5, 0, 0).unwrap()
    }

    fn policy() -> DefaultAlertPolicy {
        DefaultAlertPolicy {
            region_label: "경기도".to_string(),
        }
    }

    #[test]
    fn test_kst_hour_offset() {
        assert_eq!(kst_hour(Utc.with_ymd_and_hms(2025, 1, 6, 3, 0, 0).unwrap()), 12);
        // Wraps across midnight
        assert_eq!(kst_hour(Utc.with_ymd_and_hms(2025, 1, 6, 16, 0, 0).unwrap()), 1);
    }

    #[test]
    fn test_collect_combines_feeds_with_agency_filter() {
        let alerts = collect_feed_alerts(Some(LIFE_FEED), Some(WARNING_FEED), now());
        // Agency notice from the warning feed is dropped
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().any(|a| a.title == "자외선"));
        assert!(alerts.iter().any(|a| a.title == "호우주의보"));
    }

    #[test]
    fn test_collect_tolerates_missing_feed() {
        let alerts = collect_feed_alerts(None, Some(WARNING_FEED), now());
        assert_eq!(alerts.len(), 1);
        assert!(collect_feed_alerts(None, None, now()).is_empty());
    }

    #[tokio::test]
    async fn test_poll_once_finalizes_alerts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/life.rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LIFE_FEED))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/warning.rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(WARNING_FEED))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "ua");
        let finalized = poll_once(
            &client,
            &format!("{}/life.rss", server.uri()),
            &format!("{}/warning.rss", server.uri()),
            "경기",
            &policy(),
            now(),
        )
        .await
        .unwrap();
        // The 경기 warning sorts ahead of the nationwide UV info item
        assert_eq!(finalized[0].title, "호우주의보");
        assert_eq!(finalized.len(), 2);
    }

    #[tokio::test]
    async fn test_poll_once_all_feeds_down_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "ua");
        let url = format!("{}/any.rss", server.uri());
        let result = poll_once(&client, &url, &url, "경기", &policy(), now()).await;
        assert!(result.is_none());
    }
}
