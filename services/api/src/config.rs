//! Service configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Prefix of every environment variable read by [`AppConfig::from_env`]
pub const ENV_PREFIX: &str = "STICKERFORGE";

/// Runtime configuration of the API service
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding uploads and derived files
    pub scratch_dir: PathBuf,
    /// Request body limit for every upload endpoint
    pub max_upload_bytes: usize,
    /// Tighter limit for icon conversion
    pub max_image_upload_bytes: u64,
    /// Per-invocation limit for ffmpeg/ffprobe
    pub tool_timeout_secs: u64,
    /// Scratch files older than this are swept
    pub stale_after_secs: u64,
    /// Cron expression (with seconds) of the stale-file sweep
    pub sweep_schedule: String,
    /// CORS origin; any origin is allowed when unset
    pub allowed_origin: Option<String>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub preview_ttl_secs: u64,
    pub edit_ttl_secs: u64,
    pub download_ttl_secs: u64,
}

impl AppConfig {
    /// Load the configuration from `STICKERFORGE_*` environment variables
    ///
    /// # Environment Variables
    /// - `STICKERFORGE_HOST` (default: 127.0.0.1)
    /// - `STICKERFORGE_PORT` (default: 5000)
    /// - `STICKERFORGE_SCRATCH_DIR` (default: temp_uploads)
    /// - `STICKERFORGE_MAX_UPLOAD_BYTES` (default: 100 MiB)
    /// - `STICKERFORGE_TOOL_TIMEOUT_SECS` (default: 300)
    /// - `STICKERFORGE_ALLOWED_ORIGIN`, `STICKERFORGE_FFMPEG_PATH`,
    ///   `STICKERFORGE_FFPROBE_PATH` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 5000)?
            .set_default("scratch_dir", "temp_uploads")?
            .set_default("max_upload_bytes", 100 * 1024 * 1024)?
            .set_default("max_image_upload_bytes", 10 * 1024 * 1024)?
            .set_default("tool_timeout_secs", 300)?
            .set_default("stale_after_secs", 3600)?
            .set_default("sweep_schedule", "0 */10 * * * *")?
            .set_default("preview_ttl_secs", 30)?
            .set_default("edit_ttl_secs", 60)?
            .set_default("download_ttl_secs", 10)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be non-zero");
        }
        if self.max_upload_bytes == 0 || self.max_image_upload_bytes == 0 {
            bail!("upload limits must be non-zero");
        }
        if self.tool_timeout_secs == 0 {
            bail!("tool_timeout_secs must be non-zero");
        }
        if self.sweep_schedule.trim().is_empty() {
            bail!("sweep_schedule must not be empty");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn preview_ttl(&self) -> Duration {
        Duration::from_secs(self.preview_ttl_secs)
    }

    pub fn edit_ttl(&self) -> Duration {
        Duration::from_secs(self.edit_ttl_secs)
    }

    pub fn download_ttl(&self) -> Duration {
        Duration::from_secs(self.download_ttl_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            scratch_dir: PathBuf::from("temp_uploads"),
            max_upload_bytes: 100 * 1024 * 1024,
            max_image_upload_bytes: 10 * 1024 * 1024,
            tool_timeout_secs: 300,
            stale_after_secs: 3600,
            sweep_schedule: "0 */10 * * * *".to_string(),
            allowed_origin: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            preview_ttl_secs: 30,
            edit_ttl_secs: 60,
            download_ttl_secs: 10,
        }
    }
}
