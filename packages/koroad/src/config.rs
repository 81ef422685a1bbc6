//! Provider configuration, loaded from TOML and overridden by environment.
//!
//! ```toml
//! api_key = "..."
//! base_url = "https://opendata.koroad.or.kr/data/rest"
//! request_timeout_secs = 30
//! max_retry_attempts = 3
//! ```

use std::path::Path;
use std::time::Duration;

use safewalk_koroad_models::SearchCriteria;
use safewalk_koroad_models::criteria::MAX_ROWS_PER_PAGE;
use serde::Deserialize;

use crate::KoroadError;
use crate::retry::RetryPolicy;

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "KOROAD_API_KEY";

/// Environment variable overriding [`KoroadConfig::base_url`].
pub const BASE_URL_ENV: &str = "KOROAD_BASE_URL";

/// Settings for [`crate::KoroadGateway`].
#[derive(Clone, PartialEq, Deserialize)]
pub struct KoroadConfig {
    /// Provider credential, sent as `authKey`.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// End-to-end budget for one call, retries included.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Budget for one availability probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Rows per page when a caller does not choose one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Largest page the gateway will request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Pacing for paged bulk collection.
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://opendata.koroad.or.kr/data/rest".to_string()
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

const fn default_max_retry_attempts() -> u32 {
    3
}

const fn default_retry_interval_ms() -> u64 {
    1000
}

const fn default_retry_multiplier() -> f64 {
    2.0
}

const fn default_max_retry_delay_ms() -> u64 {
    8000
}

const fn default_page_size() -> u32 {
    100
}

const fn default_max_page_size() -> u32 {
    MAX_ROWS_PER_PAGE
}

const fn default_max_requests_per_second() -> u32 {
    10
}

fn default_user_agent() -> String {
    "SafeWalk/1.0".to_string()
}

impl std::fmt::Debug for KoroadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KoroadConfig")
            .field("api_key", &crate::mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("retry_multiplier", &self.retry_multiplier)
            .field("max_retry_delay_ms", &self.max_retry_delay_ms)
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .field("max_requests_per_second", &self.max_requests_per_second)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for KoroadConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_multiplier: default_retry_multiplier(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_requests_per_second: default_max_requests_per_second(),
            user_agent: default_user_agent(),
        }
    }
}

impl KoroadConfig {
    /// Creates a default configuration with the given credential.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Parses a TOML document, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::Toml`] if the document is malformed, or
    /// [`KoroadError::Config`] if the result fails [`Self::validate`].
    pub fn from_toml_str(contents: &str) -> Result<Self, KoroadError> {
        let mut config: Self = toml::from_str(contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::Io`] if the file cannot be read, otherwise see
    /// [`Self::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, KoroadError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded Koroad config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Builds a configuration from defaults and environment variables only.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::Config`] if `KOROAD_API_KEY` is unset.
    pub fn from_env() -> Result<Self, KoroadError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`KoroadError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), KoroadError> {
        let fail = |message: &str| {
            Err(KoroadError::Config {
                message: message.to_string(),
            })
        };

        if self.api_key.trim().is_empty() {
            return fail("api_key is required (set KOROAD_API_KEY)");
        }
        if self.base_url.trim().is_empty() {
            return fail("base_url must not be empty");
        }
        if self.connect_timeout_secs == 0
            || self.request_timeout_secs == 0
            || self.probe_timeout_secs == 0
        {
            return fail("timeouts must be positive");
        }
        if !(self.retry_multiplier.is_finite() && self.retry_multiplier >= 1.0) {
            return fail("retry_multiplier must be at least 1.0");
        }
        if self.max_page_size == 0 || self.max_page_size > MAX_ROWS_PER_PAGE {
            return fail("max_page_size must be between 1 and 1000");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return fail("default_page_size must be between 1 and max_page_size");
        }
        if self.max_requests_per_second == 0 {
            return fail("max_requests_per_second must be positive");
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Minimum spacing between sequential bulk page requests.
    #[must_use]
    pub fn page_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.max_requests_per_second.max(1)))
    }

    /// First page of `year` at [`Self::default_page_size`].
    #[must_use]
    pub fn search_criteria(&self, year: impl Into<String>) -> SearchCriteria {
        SearchCriteria::new(year).with_page_size(self.default_page_size)
    }

    /// Policy for data fetches.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retry_attempts,
            base_delay: Duration::from_millis(self.retry_interval_ms),
            multiplier: self.retry_multiplier,
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
            max_duration: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Policy for availability probes: one attempt, short budget.
    #[must_use]
    pub const fn probe_policy(&self) -> RetryPolicy {
        RetryPolicy::none(Duration::from_secs(self.probe_timeout_secs))
    }
}
