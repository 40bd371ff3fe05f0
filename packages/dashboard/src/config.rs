//! Runtime configuration, read from the environment at startup.

use chrono::FixedOffset;
use std::time::Duration;

use crate::DashboardError;

/// Default primary feed polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default analytics reporting interval.
pub const DEFAULT_ANALYTICS_INTERVAL: Duration = Duration::from_secs(30);

/// Default operator timezone offset in hours (America/El_Salvador).
pub const DEFAULT_TZ_OFFSET_HOURS: i32 = -6;

/// Dashboard engine configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Remote service base URL, no trailing slash.
    pub api_base_url: String,
    /// Static authentication key.
    pub api_key: String,
    /// Primary feed polling interval.
    pub poll_interval: Duration,
    /// Analytics reporting interval.
    pub analytics_interval: Duration,
    /// Operator timezone offset. Incident timestamps are in the
    /// source's reference clock; all calendar bucketing uses this.
    pub tz: FixedOffset,
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .map_or(default, Duration::from_secs)
}

impl DashboardConfig {
    /// Reads the configuration from `RESCUE_MAP_API_URL`,
    /// `RESCUE_MAP_API_KEY`, `POLL_INTERVAL_SECS`,
    /// `ANALYTICS_INTERVAL_SECS`, and `TZ_OFFSET_HOURS`.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if a required variable is missing or
    /// the timezone offset is out of range.
    pub fn from_env() -> Result<Self, DashboardError> {
        let api_base_url = std::env::var("RESCUE_MAP_API_URL")
            .map_err(|_| DashboardError::MissingEnv("RESCUE_MAP_API_URL"))?;
        let api_key = std::env::var("RESCUE_MAP_API_KEY")
            .map_err(|_| DashboardError::MissingEnv("RESCUE_MAP_API_KEY"))?;

        let offset_hours: i32 = std::env::var("TZ_OFFSET_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_TZ_OFFSET_HOURS);
        let tz = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or(DashboardError::InvalidOffset {
                hours: offset_hours,
            })?;

        Ok(Self {
            api_base_url,
            api_key,
            poll_interval: env_secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL),
            analytics_interval: env_secs("ANALYTICS_INTERVAL_SECS", DEFAULT_ANALYTICS_INTERVAL),
            tz,
        })
    }

    /// A configuration with the given endpoint and all defaults.
    ///
    /// # Panics
    ///
    /// Never in practice; the default offset constant is in range.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            analytics_interval: DEFAULT_ANALYTICS_INTERVAL,
            tz: FixedOffset::east_opt(DEFAULT_TZ_OFFSET_HOURS * 3600)
                .expect("default offset is in range"),
        }
    }
}
