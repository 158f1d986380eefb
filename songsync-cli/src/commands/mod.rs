pub mod list;
pub mod resolve;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use songsync_core::SyncConfig;

/// Configuration flags shared by every subcommand.
///
/// Precedence, lowest first: built-in defaults, `--config` file, then these
/// flags (or their environment variables).
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML config file.
    #[arg(long, short = 'c', value_name = "FILE", env = "SONGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the record service (`/mcp` is appended).
    #[arg(long, value_name = "URL", env = "MCP_SERVICE_URL")]
    pub listing_url: Option<String>,

    /// Base URL of the music search/details/lyrics API.
    #[arg(long, value_name = "URL", env = "VKEYS_BASE_URL")]
    pub music_api: Option<String>,

    /// Local store directory.
    #[arg(long, value_name = "DIR", env = "SONGSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Retries after the first attempt of each request.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Seconds to wait between records.
    #[arg(long, value_name = "SECS")]
    pub record_delay: Option<f64>,
}

impl ConfigArgs {
    /// Build and validate the effective configuration.
    pub fn load(&self) -> Result<SyncConfig> {
        let config = self.build()?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Layer file and flags over the defaults without validating.
    pub fn build(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SyncConfig::default(),
        };

        if let Some(url) = &self.listing_url {
            config.listing.base_url = Some(url.clone());
        }
        if let Some(url) = &self.music_api {
            config.music_api.base_url = url.clone();
        }
        if let Some(store) = &self.store {
            config.store_root = store.clone();
        }
        if let Some(n) = self.max_retries {
            config.retry.max_retries = n;
        }
        if let Some(secs) = self.record_delay {
            config.record_delay_secs = secs;
        }
        Ok(config)
    }
}
