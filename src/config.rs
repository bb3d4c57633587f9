/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// KMA API Hub authentication key.
    pub kma_auth_key: String,
    /// User-Agent sent to the RSS feeds (they reject non-browser agents).
    pub feed_user_agent: String,
    pub port: u16,
    /// Top-level region that sorts first in the alert list.
    pub primary_alert_region: String,
    /// Region label shown on default informational alerts.
    pub alert_region_label: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            kma_auth_key: std::env::var("KMA_AUTH_KEY").expect("KMA_AUTH_KEY must be set"),
            feed_user_agent: std::env::var("FEED_USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
            }),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            primary_alert_region: std::env::var("PRIMARY_ALERT_REGION")
                .unwrap_or_else(|_| "경기".to_string()),
            alert_region_label: std::env::var("ALERT_REGION_LABEL")
                .unwrap_or_else(|_| "경기도".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // env mutation is process-global; no other test in this binary reads these vars
        unsafe {
            std::env::set_var("KMA_AUTH_KEY", "test-key");
            std::env::remove_var("FEED_USER_AGENT");
            std::env::remove_var("PORT");
            std::env::remove_var("PRIMARY_ALERT_REGION");
            std::env::remove_var("ALERT_REGION_LABEL");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert!(config.feed_user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.primary_alert_region, "경기");
        assert_eq!(config.alert_region_label, "경기도");
    }
}
