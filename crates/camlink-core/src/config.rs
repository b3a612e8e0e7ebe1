//! Global configuration loaded from `~/.config/camlink/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_RETRYABLE_SIGNATURES};
use crate::store::QualityMode;

/// Retry policy parameters (optional `[retry]` section in config.toml).
/// `max_attempts` counts retries; the initial try is always made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Backoff multiplier per retry.
    pub multiplier: f64,
    /// Override of the retryable error signatures; built-in set if omitted.
    #[serde(default)]
    pub retryable_signatures: Option<Vec<String>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 10,
            multiplier: 2.0,
            retryable_signatures: None,
        }
    }
}

impl RetryConfig {
    /// Build the runtime policy for an executor from this section.
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
            backoff_multiplier: self.multiplier.max(1.0),
            retryable_signatures: self.retryable_signatures.clone().unwrap_or_else(|| {
                DEFAULT_RETRYABLE_SIGNATURES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

/// `[device]` section: camera address, API paths, and call timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wireless address `connect()` falls back to when the caller gives
    /// none; with neither, loopback discovery runs instead.
    #[serde(default)]
    pub address: Option<String>,
    /// Port used with the explicit or configured address.
    pub port: u16,
    /// Ordered loopback `host:port` candidates for `connect_local()`.
    pub local_candidates: Vec<String>,
    pub info_path: String,
    pub status_path: String,
    pub shutter_path: String,
    pub listing_path: String,
    /// Timeout for control calls (info/status/shutter/listing/delete).
    pub control_timeout_secs: u64,
    /// Timeout for binary artifact downloads.
    pub download_timeout_secs: u64,
    /// Delay after a shutter call before looking for the new file.
    pub settle_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: 8080,
            local_candidates: vec![
                "127.0.0.1:8080".to_string(),
                "127.0.0.1:8888".to_string(),
                "localhost:8080".to_string(),
            ],
            info_path: "api/v1/info".to_string(),
            status_path: "api/v1/status".to_string(),
            shutter_path: "api/v1/shutter".to_string(),
            listing_path: "api/v1/files".to_string(),
            control_timeout_secs: 10,
            download_timeout_secs: 30,
            settle_delay_ms: 2000,
        }
    }
}

/// `[pipeline]` section: concurrency ceiling, request timeout, transport retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ceiling on simultaneously executing non-high-priority requests.
    pub max_concurrent: usize,
    pub request_timeout_secs: u64,
    /// Transport-level retries per request, independent of the device policy.
    pub request_retries: u32,
    /// Collection window for batched requests.
    pub batch_window_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 6,
            request_timeout_secs: 30,
            request_retries: 2,
            batch_window_ms: 10,
        }
    }
}

/// `[poll]` section: adaptive poll cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    /// Interval multiplier applied after a failed poll.
    pub backoff_factor: f64,
    pub max_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            backoff_factor: 1.5,
            max_interval_secs: 30,
        }
    }
}

/// `[transfer]` section: defaults for the orchestrator's transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub auto_transfer: bool,
    pub quality: QualityMode,
    pub delete_after_transfer: bool,
    #[serde(default)]
    pub target_collection: Option<String>,
    /// Where `FsStore` persists artifacts; current dir if omitted.
    #[serde(default)]
    pub download_dir: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            auto_transfer: true,
            quality: QualityMode::Original,
            delete_after_transfer: false,
            target_collection: None,
            download_dir: None,
        }
    }
}

/// Global configuration loaded from `~/.config/camlink/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CamlinkConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("camlink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CamlinkConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CamlinkConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CamlinkConfig = toml::from_str(&data)?;
    Ok(cfg)
}
