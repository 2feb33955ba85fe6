//! GIF to WebM conversion entry point
//!
//! `probe -> plan -> search`, shared by the HTTP endpoints and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::encoder::{Encoder, FfmpegEncoder};
use crate::error::{MediaError, MediaResult};
use crate::filter_planner::{self, FilterPlan};
use crate::models::{Background, ConversionMode, MediaInfo, QualityLevel};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::quality_search::{self, Attempt, LinearLadder};
use crate::toolchain::Toolchain;

/// Maximum output size for one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeCeiling {
    bytes: u64,
}

impl SizeCeiling {
    pub const MIN_KB: u64 = 64;
    pub const MAX_KB: u64 = 2048;
    pub const DEFAULT_KB: u64 = 256;
    /// Previews favor fidelity over size
    pub const PREVIEW_KB: u64 = 2048;

    /// Ceiling for `mode`; sticker and emoji take the caller's value in
    /// `[MIN_KB, MAX_KB]`, preview ignores it.
    pub fn for_mode(mode: ConversionMode, requested_kb: u64) -> MediaResult<Self> {
        let kb = match mode {
            ConversionMode::Preview => Self::PREVIEW_KB,
            ConversionMode::Sticker | ConversionMode::Emoji => {
                if !(Self::MIN_KB..=Self::MAX_KB).contains(&requested_kb) {
                    return Err(MediaError::InvalidParameter(format!(
                        "Invalid max_size. Must be between {} and {} KB",
                        Self::MIN_KB,
                        Self::MAX_KB
                    )));
                }
                requested_kb
            }
        };
        Ok(Self { bytes: kb * 1024 })
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn kb(&self) -> u64 {
        self.bytes / 1024
    }
}

/// Per-request conversion parameters
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub mode: ConversionMode,
    pub ceiling: SizeCeiling,
    pub background: Background,
}

/// Report of a successful conversion
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub output_path: PathBuf,
    pub source_size_bytes: u64,
    pub output_size_bytes: u64,
    pub level: QualityLevel,
    pub attempts: Vec<Attempt>,
    pub source: MediaInfo,
    /// Probe of the result; `None` when the re-probe failed
    pub output: Option<MediaInfo>,
    pub plan: FilterPlan,
}

impl Conversion {
    /// `1 - output/source`, undefined for an empty source
    pub fn compression_ratio(&self) -> Option<f64> {
        quality_search::compression_ratio(self.source_size_bytes, self.output_size_bytes)
    }
}

/// Runs conversions with an injected prober and encoder
#[derive(Clone)]
pub struct Converter {
    probe: Arc<dyn MediaProbe>,
    encoder: Arc<dyn Encoder>,
    levels: Vec<QualityLevel>,
}

impl Converter {
    pub fn new(probe: Arc<dyn MediaProbe>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            probe,
            encoder,
            levels: QualityLevel::DEFAULT_LADDER.to_vec(),
        }
    }

    /// Converter backed by the real ffprobe/ffmpeg executables
    pub fn with_toolchain(tools: Toolchain) -> Self {
        Self::new(
            Arc::new(FfprobeProbe::new(tools.clone())),
            Arc::new(FfmpegEncoder::new(tools)),
        )
    }

    /// Replace the quality ladder
    pub fn with_levels(mut self, levels: Vec<QualityLevel>) -> Self {
        self.levels = levels;
        self
    }

    pub async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        self.probe.probe(path).await
    }

    /// Convert `source` into a WebM at `output`
    ///
    /// Nothing is left at `output` unless the conversion succeeds.
    pub async fn convert(
        &self,
        source: &Path,
        output: &Path,
        options: ConvertOptions,
    ) -> MediaResult<Conversion> {
        let source_info = self.probe.probe(source).await?;
        if source_info.is_degenerate() {
            return Err(MediaError::InvalidMedia(format!(
                "{}x{} for {:.2}s",
                source_info.width, source_info.height, source_info.duration_secs
            )));
        }
        let source_size_bytes = tokio::fs::metadata(source).await?.len();

        info!(
            "Converting {} ({}x{}, {:.2}s) as {} under {} KB",
            source.display(),
            source_info.width,
            source_info.height,
            source_info.duration_secs,
            options.mode,
            options.ceiling.kb()
        );

        let plan = filter_planner::plan(&source_info, options.mode, options.background);
        let mut strategy = LinearLadder::new(self.levels.clone());
        let outcome = quality_search::search(
            self.encoder.as_ref(),
            &mut strategy,
            source,
            &plan,
            options.ceiling.bytes(),
            output,
        )
        .await?;

        let output_info = match self.probe.probe(output).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Could not probe converted output {}: {}", output.display(), e);
                None
            }
        };

        Ok(Conversion {
            output_path: outcome.output.path,
            source_size_bytes,
            output_size_bytes: outcome.output.size_bytes,
            level: outcome.level,
            attempts: outcome.attempts,
            source: source_info,
            output: output_info,
            plan,
        })
    }
}
