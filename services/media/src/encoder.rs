//! WebM encoding at a single quality level

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::MediaResult;
use crate::filter_planner::FilterPlan;
use crate::models::{EncodedFile, QualityLevel};
use crate::toolchain::Toolchain;

/// Encodes a source with a plan at one quality level into `artifact`
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(
        &self,
        source: &Path,
        plan: &FilterPlan,
        level: QualityLevel,
        artifact: &Path,
    ) -> MediaResult<EncodedFile>;
}

/// VP9/WebM [`Encoder`] backed by the ffmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    tools: Toolchain,
}

impl FfmpegEncoder {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        source: &Path,
        plan: &FilterPlan,
        level: QualityLevel,
        artifact: &Path,
    ) -> MediaResult<EncodedFile> {
        self.tools
            .ffmpeg()
            .args(encode_args(source, plan, level, artifact))
            .execute()
            .await?;

        let size_bytes = tokio::fs::metadata(artifact).await?.len();
        debug!("Encoded {} at {}: {} bytes", artifact.display(), level, size_bytes);

        Ok(EncodedFile {
            path: artifact.to_path_buf(),
            size_bytes,
        })
    }
}

/// ffmpeg arguments for one attempt: VP9 in constant-quality mode, alpha
/// preserved, audio dropped.
pub fn encode_args(
    source: &Path,
    plan: &FilterPlan,
    level: QualityLevel,
    artifact: &Path,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-t".to_string(),
        plan.duration_cap_secs.to_string(),
        "-c:v".to_string(),
        "libvpx-vp9".to_string(),
        "-crf".to_string(),
        level.crf().to_string(),
        "-b:v".to_string(),
        "0".to_string(),
        "-an".to_string(),
        "-pix_fmt".to_string(),
        "yuva420p".to_string(),
        "-vf".to_string(),
        plan.filter_graph(),
        "-f".to_string(),
        "webm".to_string(),
        artifact.to_string_lossy().to_string(),
    ]
}
