//! `AppConfig`: process-wide configuration loaded once at startup
//! (SPEC_FULL.md section 11). Never re-read from inside request handlers;
//! collaborators take values or `Arc<AppConfig>`, not a live config lookup.
//! `clap`-derived args are parsed once in `main` and threaded down from
//! there.

use clap::Parser;
use std::time::Duration;

use crate::recap::RecapConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "sessionhub", about = "Session analytics & smart-recap backend")]
pub struct AppConfig {
    /// Postgres connection string for the metadata store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Base URL the object store adapter downloads chunks from.
    #[arg(long, env = "OBJECT_STORE_URL")]
    pub object_store_url: String,

    /// Address the HTTP server binds to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Master switch for the smart-recap feature (spec.md §4.5).
    #[arg(long, env = "SMART_RECAP_ENABLED", default_value_t = false)]
    pub smart_recap_enabled: bool,

    #[arg(long, env = "ANTHROPIC_API_KEY")]
    pub smart_recap_api_key: Option<String>,

    #[arg(long, env = "SMART_RECAP_MODEL")]
    pub smart_recap_model: Option<String>,

    #[arg(long, env = "SMART_RECAP_BASE_URL", default_value = "https://api.anthropic.com")]
    pub smart_recap_base_url: String,

    /// Monthly per-owner cap on completed generations (spec.md §4.5).
    #[arg(long, env = "SMART_RECAP_QUOTA_LIMIT", default_value_t = 50)]
    pub smart_recap_quota_limit: u32,

    /// Seconds a generation lock is honored before another task may steal it.
    #[arg(long, env = "SMART_RECAP_LOCK_TIMEOUT_SECONDS", default_value_t = 120)]
    pub smart_recap_lock_timeout_seconds: u64,

    /// Advisory only; not used to invalidate cached cards (spec.md §4.5).
    #[arg(long, env = "SMART_RECAP_STALENESS_MINUTES", default_value_t = 60)]
    pub smart_recap_staleness_minutes: u32,

    /// `RUST_LOG`-style filter directive for `tracing-subscriber`.
    #[arg(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

impl AppConfig {
    pub fn recap_config(&self) -> RecapConfig {
        RecapConfig {
            enabled: self.smart_recap_enabled,
            api_key: self.smart_recap_api_key.clone(),
            model: self.smart_recap_model.clone(),
            quota_limit: self.smart_recap_quota_limit,
            lock_timeout: Duration::from_secs(self.smart_recap_lock_timeout_seconds),
            staleness_minutes: self.smart_recap_staleness_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recap_config_carries_master_switch_and_limits() {
        let config = AppConfig {
            database_url: "postgres://localhost/sessionhub".into(),
            object_store_url: "http://localhost:9000".into(),
            bind_addr: "0.0.0.0:8080".into(),
            smart_recap_enabled: true,
            smart_recap_api_key: Some("key".into()),
            smart_recap_model: Some("claude-sonnet-4-5".into()),
            smart_recap_base_url: "https://api.anthropic.com".into(),
            smart_recap_quota_limit: 10,
            smart_recap_lock_timeout_seconds: 90,
            smart_recap_staleness_minutes: 30,
            log_filter: "info".into(),
        };
        let recap = config.recap_config();
        assert!(recap.is_usable());
        assert_eq!(recap.quota_limit, 10);
        assert_eq!(recap.lock_timeout, Duration::from_secs(90));
    }
}
