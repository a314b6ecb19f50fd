use std::env;
use std::time::Duration;

use crate::services::api::http::DEFAULT_TIMEOUT;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub captcha_secret: String,
    pub captcha_ttl_secs: i64,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_timeout: env::var("API_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            // A per-process secret invalidates outstanding challenges on restart.
            captcha_secret: env::var("CAPTCHA_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            captcha_ttl_secs: env::var("CAPTCHA_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty()),
        }
    }
}
