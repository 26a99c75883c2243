//! Configuration loading from environment variables.

use std::time::Duration;

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "ITINERARIO_GOOGLE_API_KEY";
pub const CALENDAR_ID_VAR: &str = "ITINERARIO_GOOGLE_CALENDAR_ID";
pub const BASE_URL_VAR: &str = "ITINERARIO_GOOGLE_BASE_URL";
pub const TIMEOUT_VAR: &str = "ITINERARIO_FETCH_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a public Google Calendar.
#[derive(Clone)]
pub struct GoogleCalendarConfig {
    pub api_key: String,
    pub calendar_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GoogleCalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarConfig")
            .field("api_key", &"<redacted>")
            .field("calendar_id", &self.calendar_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GoogleCalendarConfig {
    pub fn new(
        api_key: impl Into<String>,
        calendar_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into().trim().to_string();
        let calendar_id = calendar_id.into().trim().to_string();

        if api_key.is_empty() {
            return Err(ConfigError::Empty(API_KEY_VAR));
        }
        if calendar_id.is_empty() {
            return Err(ConfigError::Empty(CALENDAR_ID_VAR));
        }

        Ok(Self {
            api_key,
            calendar_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load settings from the environment.
    ///
    /// Reads a `.env` file if present. Returns `Ok(None)` when neither
    /// credential is set, meaning the calendar integration is disabled.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR);
        let calendar_id = lookup(CALENDAR_ID_VAR);

        let (api_key, calendar_id) = match (api_key, calendar_id) {
            (None, None) => return Ok(None),
            (Some(key), Some(id)) => (key, id),
            (None, Some(_)) => return Err(ConfigError::Missing(API_KEY_VAR)),
            (Some(_), None) => return Err(ConfigError::Missing(CALENDAR_ID_VAR)),
        };

        let mut config = Self::new(api_key, calendar_id)?;

        if let Some(base_url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(base_url.trim());
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: TIMEOUT_VAR,
                reason: format!("'{raw}' is not a whole number of seconds"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: TIMEOUT_VAR,
                    reason: "timeout must be at least one second".to_string(),
                });
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(Some(config))
    }
}
