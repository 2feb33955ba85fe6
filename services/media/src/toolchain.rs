//! Discovery of the ffmpeg and ffprobe executables

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::command::{DEFAULT_TIMEOUT, ToolCommand};
use crate::error::{MediaError, MediaResult};

/// Resolved locations of the external tools plus the per-run time limit
#[derive(Debug, Clone)]
pub struct Toolchain {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl Toolchain {
    /// Resolve both tools, honoring explicit paths when given
    ///
    /// Done once at startup.
    pub fn locate(
        ffmpeg: Option<&Path>,
        ffprobe: Option<&Path>,
        timeout: Duration,
    ) -> MediaResult<Self> {
        let ffmpeg = resolve("ffmpeg", ffmpeg)?;
        let ffprobe = resolve("ffprobe", ffprobe)?;
        info!(
            "Using ffmpeg at {} and ffprobe at {}",
            ffmpeg.display(),
            ffprobe.display()
        );
        Ok(Self {
            ffmpeg,
            ffprobe,
            timeout,
        })
    }

    /// Build a toolchain without looking anything up
    pub fn from_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn ffmpeg(&self) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg).timeout(self.timeout)
    }

    pub fn ffprobe(&self) -> ToolCommand {
        ToolCommand::new(&self.ffprobe).timeout(self.timeout)
    }

    /// Health check: does `ffmpeg -version` run?
    pub async fn check(&self) -> bool {
        match self.ffmpeg().arg("-version").execute().await {
            Ok(_) => true,
            Err(e) => {
                warn!("ffmpeg health check failed: {}", e);
                false
            }
        }
    }
}

fn resolve(name: &str, explicit: Option<&Path>) -> MediaResult<PathBuf> {
    let candidate = explicit.unwrap_or_else(|| Path::new(name));
    which::which(candidate).map_err(|e| {
        warn!("Could not locate {}: {}", name, e);
        MediaError::ToolUnavailable(name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_path_is_unavailable() {
        let result = Toolchain::locate(
            Some(Path::new("/definitely/not/here/ffmpeg")),
            None,
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(MediaError::ToolUnavailable(name)) if name == "ffmpeg"));
    }

    #[tokio::test]
    async fn test_check_fails_for_missing_binary() {
        let tools = Toolchain::from_paths("/definitely/not/here/ffmpeg", "ffprobe");
        assert!(!tools.check().await);
    }
}
