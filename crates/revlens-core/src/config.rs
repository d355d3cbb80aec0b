use std::time::Duration;

use crate::constants::{env, DEFAULT_REQUEST_TIMEOUT, UNBOUNDED_PAGE_SIZE};
use crate::error::ReviewError;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// GitLab host, e.g. `https://gitlab.com`
    pub base_url: String,
    /// Token with `read_api` scope
    pub token: String,
    /// Page size for unbounded scans
    pub per_page: u32,
    pub request_timeout: Duration,
}

impl CoreConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Build a config from `REVLENS_*` environment variables.
    pub fn from_env() -> Result<Self, ReviewError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReviewError> {
        let token = lookup(env::TOKEN).unwrap_or_default();
        if token.is_empty() {
            return Err(ReviewError::Configuration(format!(
                "gitlab token not provided, set {}",
                env::TOKEN
            )));
        }

        let mut config = Self {
            token,
            ..Self::default()
        };
        if let Some(base_url) = lookup(env::BASE_URL).filter(|url| !url.is_empty()) {
            config.base_url = base_url;
        }

        if let Some(raw) = lookup(env::PER_PAGE) {
            config.per_page = raw.parse().map_err(|_| {
                ReviewError::Configuration(format!("{} must be a number, got {raw:?}", env::PER_PAGE))
            })?;
        }

        if let Some(raw) = lookup(env::REQUEST_TIMEOUT_SECS) {
            let secs: u64 = raw.parse().map_err(|_| {
                ReviewError::Configuration(format!(
                    "{} must be a number of seconds, got {raw:?}",
                    env::REQUEST_TIMEOUT_SECS
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.com".to_string(),
            token: String::new(),
            per_page: UNBOUNDED_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
