pub mod acquire;
pub mod domain;
pub mod llm;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub stale_threshold_hours: Option<i64>,
        pub refresh_cutoff_utc_hour: Option<u32>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                stale_threshold_hours: std::env::var("STALE_THRESHOLD_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok()),
                refresh_cutoff_utc_hour: std::env::var("REFRESH_CUTOFF_UTC_HOUR")
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }
}
