//! Engine configuration.
//!
//! A [`SyncConfig`] is built once by the caller (defaults, then an optional
//! YAML file, then command-line/env overrides) and passed explicitly to the
//! engine. Nothing here reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MUSIC_API_URL: &str = "https://api.vkeys.cn/v2/music/tencent";
pub const DEFAULT_STORE_ROOT: &str = "downloads";

/// Where the authoritative record list is fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Base URL of the record service; `/mcp` is appended.
    pub base_url: Option<String>,
    /// Records requested per call. The service caps a page at 100.
    pub page_size: u32,
    /// Upper bound on records fetched in one pass.
    pub max_records: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            page_size: 100,
            max_records: 10_000,
        }
    }
}

/// Search / details / lyrics API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MusicApiConfig {
    pub base_url: String,
}

impl Default for MusicApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MUSIC_API_URL.to_string(),
        }
    }
}

/// Retry budget for every outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub initial_delay_secs: f64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_secs: 2.0,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        secs(self.initial_delay_secs)
    }
}

/// Complete configuration for one sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub listing: ListingConfig,
    pub music_api: MusicApiConfig,
    /// Root directory of the local content store.
    pub store_root: PathBuf,
    pub retry: RetryConfig,
    pub request_timeout_secs: u64,
    /// Pause between records to stay under the music API's rate limit.
    pub record_delay_secs: f64,
    /// Existing media files at least this large are treated as synced.
    pub min_media_bytes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            listing: ListingConfig::default(),
            music_api: MusicApiConfig::default(),
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            retry: RetryConfig::default(),
            request_timeout_secs: 30,
            record_delay_secs: 2.0,
            min_media_bytes: 1024,
        }
    }
}

impl SyncConfig {
    /// Load a config from a YAML file. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every setting the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.music_api.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("music_api.base_url"));
        }
        if self.listing.page_size == 0 {
            return Err(invalid("listing.page_size", "must be at least 1"));
        }
        if self.listing.max_records == 0 {
            return Err(invalid(
                "listing.max_records",
                "must be at least 1; an empty list would empty the store",
            ));
        }
        if self.store_root.as_os_str().is_empty() {
            return Err(ConfigError::Missing("store_root"));
        }
        if !is_non_negative(self.retry.initial_delay_secs) {
            return Err(invalid(
                "retry.initial_delay_secs",
                "must be a finite, non-negative number",
            ));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(invalid("retry.multiplier", "must be a finite number >= 1"));
        }
        if !is_non_negative(self.record_delay_secs) {
            return Err(invalid(
                "record_delay_secs",
                "must be a finite, non-negative number",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        // Checked last so callers that never list can tolerate its absence.
        match self.listing.base_url.as_deref().map(str::trim) {
            None | Some("") => Err(ConfigError::Missing("listing.base_url")),
            Some(_) => Ok(()),
        }
    }

    pub fn listing_url(&self) -> Option<&str> {
        self.listing.base_url.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn record_delay(&self) -> Duration {
        secs(self.record_delay_secs)
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
