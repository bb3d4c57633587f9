//! KMA API Hub client.
//!
//! Wraps the typ01 text endpoints (surface observations), the typ02
//! village forecast JSON endpoint, and the two public advisory RSS feeds.
//! See: https://apihub.kma.go.kr

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::errors::AppError;
use crate::services::forecast::{FcstItem, VilageFcstResponse};
use crate::services::surface::{
    parse_telemetry, SurfaceRecord, SFCDD_COLUMNS, SFCMM_COLUMNS, SFCTM_COLUMNS,
};

const KMA_TYP01_BASE: &str = "https://apihub.kma.go.kr/api/typ01/url";
const KMA_TYP02_BASE: &str = "https://apihub.kma.go.kr/api/typ02/openApi";

/// Life-weather advisory RSS feed.
pub const LIFE_FEED_URL: &str =
    "https://www.kma.go.kr/weather/lifenindustry/service/lifeweather_list.rss";
/// Warning (특보) RSS feed.
pub const WARNING_FEED_URL: &str = "https://www.kma.go.kr/cgi-bin/rss/weather/wrn.rss";

/// Rows requested per village-forecast call (one run is < 1000 rows).
const VILAGE_NUM_ROWS: u32 = 1000;

/// Client for the KMA API Hub and RSS feeds.
#[derive(Debug, Clone)]
pub struct KmaClient {
    client: reqwest::Client,
    auth_key: String,
    /// Browser-like UA — the RSS endpoints reject default client agents.
    feed_user_agent: String,
    typ01_base: String,
    typ02_base: String,
}

impl KmaClient {
    pub fn new(auth_key: &str, feed_user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            auth_key: auth_key.to_string(),
            feed_user_agent: feed_user_agent.to_string(),
            typ01_base: KMA_TYP01_BASE.to_string(),
            typ02_base: KMA_TYP02_BASE.to_string(),
        }
    }

    /// Point the client at alternative base URLs (tests).
    pub fn with_bases(mut self, typ01_base: &str, typ02_base: &str) -> Self {
        self.typ01_base = typ01_base.to_string();
        self.typ02_base = typ02_base.to_string();
        self
    }

    async fn fetch_typ01(&self, path_query: String) -> Result<String, AppError> {
        let url = format!(
            "{}/{}&authKey={}",
            self.typ01_base, path_query, self.auth_key
        );
        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("KMA API Hub request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "KMA API Hub returned HTTP {}",
                response.status()
            )));
        }

        response.text().await.map_err(|e| {
            AppError::ExternalServiceError(format!("KMA API Hub body read error: {}", e))
        })
    }

    /// Hourly surface observations for one timestamp (`YYYYMMDDHHMM`).
    /// `stn = 0` returns every station in one response.
    pub async fn fetch_surface(&self, tm: &str, stn: i32) -> Result<Vec<SurfaceRecord>, AppError> {
        let text = self
            .fetch_typ01(format!("kma_sfctm2.php?tm={}&stn={}", tm, stn))
            .await?;
        Ok(parse_telemetry(&text, &SFCTM_COLUMNS))
    }

    /// Hourly surface observations over a time range. Same column layout
    /// as the single-timestamp query.
    pub async fn fetch_surface_period(
        &self,
        tm1: &str,
        tm2: &str,
        stn: i32,
    ) -> Result<Vec<SurfaceRecord>, AppError> {
        let text = self
            .fetch_typ01(format!("kma_sfctm3.php?tm1={}&tm2={}&stn={}", tm1, tm2, stn))
            .await?;
        Ok(parse_telemetry(&text, &SFCTM_COLUMNS))
    }

    /// Daily surface summaries over a date range (`YYYYMMDD`).
    pub async fn fetch_daily(
        &self,
        tm1: &str,
        tm2: &str,
        stn: i32,
    ) -> Result<Vec<SurfaceRecord>, AppError> {
        let text = self
            .fetch_typ01(format!("kma_sfcdd.php?tm1={}&tm2={}&stn={}", tm1, tm2, stn))
            .await?;
        Ok(parse_telemetry(&text, &SFCDD_COLUMNS))
    }

    /// Monthly surface summary for one `YYYYMM`.
    pub async fn fetch_monthly(
        &self,
        year_month: &str,
        stn: i32,
    ) -> Result<Vec<SurfaceRecord>, AppError> {
        let text = self
            .fetch_typ01(format!("kma_sfcmm.php?tm={}&stn={}", year_month, stn))
            .await?;
        Ok(parse_telemetry(&text, &SFCMM_COLUMNS))
    }

    /// Village forecast rows for one grid cell and issue time.
    pub async fn fetch_vilage_forecast(
        &self,
        nx: i32,
        ny: i32,
        base_date: &str,
        base_time: &str,
    ) -> Result<Vec<FcstItem>, AppError> {
        let url = format!(
            "{}/VilageFcstInfoService_2.0/getVilageFcst?pageNo=1&numOfRows={}&dataType=JSON&base_date={}&base_time={}&nx={}&ny={}&authKey={}",
            self.typ02_base, VILAGE_NUM_ROWS, base_date, base_time, nx, ny, self.auth_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::ExternalServiceError(format!("KMA forecast request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "KMA forecast returned HTTP {}",
                response.status()
            )));
        }

        let parsed: VilageFcstResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("KMA forecast JSON parse error: {}", e))
        })?;

        Ok(parsed
            .response
            .body
            .map(|body| body.items.item)
            .unwrap_or_default())
    }

    /// Fetch an RSS advisory feed as raw XML.
    pub async fn fetch_feed(&self, url: &str) -> Result<String, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.feed_user_agent)
                .map_err(|e| AppError::InternalError(format!("Invalid User-Agent: {}", e)))?,
        );

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Advisory feed request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Advisory feed returned HTTP {}",
                response.status()
            )));
        }

        response.text().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Advisory feed body read error: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_BODY: &str = "#START7777\n# comment\n20250106120000 119 320 2.1 -9 -9 -9 1013.2 1012.0 -9 -9 18.5 12.3 65 -9 0.0\n#7777END\n";

    #[tokio::test]
    async fn test_fetch_surface_parses_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kma_sfctm2.php"))
            .and(query_param("tm", "202501061200"))
            .and(query_param("stn", "0"))
            .and(query_param("authKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_BODY))
            .mount(&server)
            .await;

        let client = KmaClient::new("test-key", "test-agent").with_bases(&server.uri(), &server.uri());
        let records = client.fetch_surface("202501061200", 0).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number("TA"), Some(18.5));
        assert_eq!(records[0].station_id(), Some(119));
    }

    #[tokio::test]
    async fn test_fetch_surface_http_error_is_external() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kma_sfctm2.php"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "ua").with_bases(&server.uri(), &server.uri());
        let err = client.fetch_surface("202501061200", 0).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn test_fetch_vilage_forecast() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL_SERVICE" },
                "body": { "items": { "item": [
                    { "category": "TMP", "fcstDate": "20250106",
                      "fcstTime": "1400", "fcstValue": "3.5" }
                ] } }
            }
        });
        Mock::given(method("GET"))
            .and(path("/VilageFcstInfoService_2.0/getVilageFcst"))
            .and(query_param("nx", "60"))
            .and(query_param("ny", "121"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "ua").with_bases(&server.uri(), &server.uri());
        let items = client
            .fetch_vilage_forecast(60, 121, "20250106", "1100")
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fcst_value, "3.5");
    }

    #[tokio::test]
    async fn test_fetch_vilage_forecast_empty_body() {
        let server = MockServer::start().await;
        // The service omits `body` entirely when a run has no rows yet
        let body = serde_json::json!({
            "response": {
                "header": { "resultCode": "03", "resultMsg": "NO_DATA" }
            }
        });
        Mock::given(method("GET"))
            .and(path("/VilageFcstInfoService_2.0/getVilageFcst"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "ua").with_bases(&server.uri(), &server.uri());
        let items = client
            .fetch_vilage_forecast(60, 121, "20250106", "1100")
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_feed_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.rss"))
            .and(wiremock::matchers::header("user-agent", "Mozilla/5.0 test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .mount(&server)
            .await;

        let client = KmaClient::new("k", "Mozilla/5.0 test");
        let xml = client
            .fetch_feed(&format!("{}/feed.rss", server.uri()))
            .await
            .unwrap();
        assert_eq!(xml, "<rss/>");
    }
}
