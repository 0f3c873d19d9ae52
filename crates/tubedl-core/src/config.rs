use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per stream transfer (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/tubedl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeConfig {
    /// Root output directory. Relative paths are resolved against the working directory.
    pub downloads_dir: PathBuf,
    /// Muxer executable (looked up on PATH unless absolute).
    pub muxer_path: String,
    /// Metadata tool executable.
    pub metadata_tool_path: String,
    /// Container family for adaptive video/audio streams.
    pub adaptive_container: String,
    /// Extension of the muxed output file.
    pub output_container: String,
    /// Kill the muxer after this many seconds (None = wait forever).
    pub mux_timeout_secs: Option<u64>,
    /// Optional bandwidth cap in bytes per second (None = no cap).
    pub max_bytes_per_sec: Option<u64>,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("Downloads"),
            muxer_path: "ffmpeg".to_string(),
            metadata_tool_path: "yt-dlp".to_string(),
            adaptive_container: "webm".to_string(),
            output_container: "mp4".to_string(),
            mux_timeout_secs: None,
            max_bytes_per_sec: None,
            retry: None,
        }
    }
}

impl TubeConfig {
    pub fn mux_timeout(&self) -> Option<Duration> {
        self.mux_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tubedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TubeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TubeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TubeConfig = toml::from_str(&data)?;
    Ok(cfg)
}
