use crate::application::retry::RetryPolicy;
use crate::domain::connection::ConnectivitySource;
use crate::domain::freshness::DEFAULT_WINDOW_MINUTES;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_freshness_window_minutes")]
    pub freshness_window_minutes: i64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub connectivity_source: ConnectivitySetting,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Tick intervals per feed. Defaults mirror the dashboard this core
/// replaces: the live marker ticks fastest, usage slowest.
#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_latest_interval_ms")]
    pub latest_interval_ms: u64,
    #[serde(default = "default_path_interval_ms")]
    pub path_interval_ms: u64,
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_usage_interval_ms")]
    pub usage_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivitySetting {
    /// Synthesize connectivity from latest-detection recency.
    #[default]
    Derived,
    /// Poll the dedicated device-status endpoint.
    Status,
}

impl SyncSettings {
    /// Settings with every default, for embedding without a config file.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            backend: BackendSettings {
                base_url: base_url.into(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            polling: PollingSettings::default(),
            retry: RetrySettings::default(),
            freshness_window_minutes: default_freshness_window_minutes(),
            page_size: default_page_size(),
            connectivity_source: ConnectivitySetting::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            delay: Duration::from_millis(self.retry.delay_ms),
        }
    }

    pub fn connectivity(&self) -> ConnectivitySource {
        match self.connectivity_source {
            ConnectivitySetting::Derived => ConnectivitySource::DerivedFromLatest,
            ConnectivitySetting::Status => ConnectivitySource::StatusFeed,
        }
    }
}

impl PollingSettings {
    pub fn latest_interval(&self) -> Duration {
        Duration::from_millis(self.latest_interval_ms)
    }

    pub fn path_interval(&self) -> Duration {
        Duration::from_millis(self.path_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn usage_interval(&self) -> Duration {
        Duration::from_millis(self.usage_interval_ms)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            latest_interval_ms: default_latest_interval_ms(),
            path_interval_ms: default_path_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
            usage_interval_ms: default_usage_interval_ms(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_latest_interval_ms() -> u64 {
    3_000
}

fn default_path_interval_ms() -> u64 {
    5_000
}

fn default_status_interval_ms() -> u64 {
    10_000
}

fn default_usage_interval_ms() -> u64 {
    300_000
}

fn default_max_attempts() -> u32 {
    4
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_freshness_window_minutes() -> i64 {
    DEFAULT_WINDOW_MINUTES
}

fn default_page_size() -> u32 {
    50
}

pub fn load_sync_settings() -> anyhow::Result<SyncSettings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/sync"))
        .add_source(config::Environment::with_prefix("VEHICLE_SYNC").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
