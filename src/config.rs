// Runtime configuration: defaults, an optional config.toml, then APP_* environment variables.

use std::time::Duration;

use anyhow::Result;
use config::{
    Config, Environment, File,
    builder::{ConfigBuilder, DefaultState},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    // Full URL of the prediction endpoint, e.g. http://127.0.0.1:8000/predict
    pub prediction_url: String,
    // 0 disables the per-request timeout.
    pub request_timeout_secs: u64,
    pub proxy_url: Option<String>,
    // Form sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
    // Upper bound on live sessions; the least recently used goes first.
    pub max_sessions: usize,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Self::defaults()?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // APP_PREDICTION_URL, APP_REQUEST_TIMEOUT_SECS, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("prediction_url", "http://127.0.0.1:8000/predict")?
            .set_default("request_timeout_secs", 30)?
            .set_default("session_idle_secs", 1800)?
            .set_default("max_sessions", 10_000)?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(request_timeout_secs: u64) -> Settings {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            prediction_url: "http://127.0.0.1:8000/predict".to_string(),
            request_timeout_secs,
            proxy_url: None,
            session_idle_secs: 60,
            max_sessions: 16,
        }
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        assert_eq!(settings(0).request_timeout(), None);
        assert_eq!(settings(15).request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings: Settings = Settings::defaults()
            .expect("defaults")
            .build()
            .and_then(|config| config.try_deserialize())
            .expect("defaults should deserialize");

        assert_eq!(settings.server_address, "127.0.0.1:3000");
        assert_eq!(settings.prediction_url, "http://127.0.0.1:8000/predict");
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
        assert!(settings.proxy_url.is_none());
        assert_eq!(settings.session_idle_secs, 1800);
        assert_eq!(settings.max_sessions, 10_000);
    }
}
