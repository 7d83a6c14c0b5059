//! Global configuration loaded from `~/.config/fdm/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::transport::CurlOptions;

/// Engine and CLI configuration. Missing fields fall back to defaults, so an
/// older config file keeps working after upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FdmConfig {
    /// Default download directory for new jobs. When unset, the CLI uses the
    /// current working directory.
    pub download_dir: Option<PathBuf>,
    /// Workers report progress after this many unreported bytes (64 KiB).
    pub progress_threshold_bytes: u64,
    /// Curl connect timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Abort a transfer when throughput stays below this many bytes/sec...
    pub low_speed_limit_bytes: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
    /// Hard per-transfer timeout, seconds.
    pub transfer_timeout_secs: u64,
    /// Capacity of the observer event channel.
    pub event_channel_capacity: usize,
}

impl Default for FdmConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            progress_threshold_bytes: 64 * 1024,
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            transfer_timeout_secs: 3600,
            event_channel_capacity: 64,
        }
    }
}

impl FdmConfig {
    /// Curl tuning derived from the timeout fields.
    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            transfer_timeout: Duration::from_secs(self.transfer_timeout_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
