//! Media probing via ffprobe

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{MediaError, MediaResult};
use crate::models::MediaInfo;
use crate::toolchain::Toolchain;

/// Frame rate assumed when the stream does not report one
const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Reads dimensions, duration and frame rate from a source file
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;
}

/// [`MediaProbe`] backed by the ffprobe executable
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    tools: Toolchain,
}

impl FfprobeProbe {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        info!("Probing {}", path.display());

        let output = self
            .tools
            .ffprobe()
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path.to_string_lossy())
            .execute()
            .await
            .map_err(|e| {
                error!("ffprobe failed for {}: {}", path.display(), e);
                match e {
                    // ffprobe ran and rejected the file
                    MediaError::Tool { message, .. } => MediaError::Probe {
                        path: path.to_path_buf(),
                        message,
                    },
                    other => other,
                }
            })?;

        let data: Value = serde_json::from_str(&output.stdout).map_err(|e| MediaError::Probe {
            path: path.to_path_buf(),
            message: format!("malformed ffprobe output: {}", e),
        })?;

        parse_probe_output(path, &data)
    }
}

/// Extract [`MediaInfo`] from `ffprobe -show_format -show_streams` JSON
///
/// Uses the first stream whose `codec_type` is `video`.
pub fn parse_probe_output(path: &Path, data: &Value) -> MediaResult<MediaInfo> {
    let stream = data
        .get("streams")
        .and_then(|v| v.as_array())
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.get("codec_type").and_then(|v| v.as_str()) == Some("video"))
        })
        .ok_or_else(|| MediaError::NoVideoStream(path.to_path_buf()))?;

    let dimension = |key: &str| -> u32 {
        stream
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v.min(u32::MAX as u64) as u32)
            .unwrap_or(0)
    };

    // ffprobe reports durations as strings; GIFs sometimes only carry it on the stream.
    let duration_secs = data
        .get("format")
        .and_then(|f| number_field(f, "duration"))
        .or_else(|| number_field(stream, "duration"))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let frame_rate = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|v| v.as_str()))
        .find_map(parse_rational)
        .unwrap_or(FALLBACK_FRAME_RATE);

    Ok(MediaInfo {
        width: dimension("width"),
        height: dimension("height"),
        duration_secs,
        frame_rate,
    })
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse `num/den` (or a bare number); zero or undefined rates yield `None`
fn parse_rational(text: &str) -> Option<f64> {
    let rate = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
