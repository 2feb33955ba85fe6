//! Size-constrained quality search
//!
//! Encodes the same source at successive quality levels until an artifact
//! fits under the size ceiling. Which level comes next is decided by a
//! [`SearchStrategy`]; the loop itself only encodes, measures, records the
//! attempt and keeps or discards the artifact.
//!
//! Exactly one artifact survives a successful search (renamed to the
//! requested output path). Every other artifact is deleted, including on
//! failure and when the search future is dropped part-way.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use common::ScratchDir;

use crate::encoder::Encoder;
use crate::error::{MediaError, MediaResult};
use crate::filter_planner::FilterPlan;
use crate::models::{EncodedFile, QualityLevel};

/// What happened at one quality level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The encoder produced an artifact of this size
    Encoded { size_bytes: u64, fits: bool },
    /// The encoder failed at this level
    Failed { reason: String },
}

/// One entry of the attempt trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub level: QualityLevel,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn size_bytes(&self) -> Option<u64> {
        match self.outcome {
            AttemptOutcome::Encoded { size_bytes, .. } => Some(size_bytes),
            AttemptOutcome::Failed { .. } => None,
        }
    }

    pub fn fits(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Encoded { fits: true, .. })
    }
}

/// Chooses the next quality level from the outcome of the previous one
///
/// Returning `None` ends the search.
pub trait SearchStrategy: Send {
    fn next(&mut self, previous: Option<&Attempt>) -> Option<QualityLevel>;
}

/// First fit over a fixed ascending ladder
///
/// Stops at the first level whose artifact fits; it does not look for a
/// better-quality level afterwards.
#[derive(Debug, Clone)]
pub struct LinearLadder {
    levels: Vec<QualityLevel>,
    cursor: usize,
}

impl LinearLadder {
    pub fn new(levels: impl Into<Vec<QualityLevel>>) -> Self {
        Self {
            levels: levels.into(),
            cursor: 0,
        }
    }
}

impl Default for LinearLadder {
    fn default() -> Self {
        Self::new(QualityLevel::DEFAULT_LADDER)
    }
}

impl SearchStrategy for LinearLadder {
    fn next(&mut self, previous: Option<&Attempt>) -> Option<QualityLevel> {
        if previous.is_some_and(Attempt::fits) {
            return None;
        }
        let level = self.levels.get(self.cursor).copied();
        self.cursor += 1;
        level
    }
}

/// Binary search over a CRF range for the lowest CRF that fits
///
/// Relies on size decreasing monotonically with CRF. A failed encode is
/// treated like an oversized one and pushes the search towards higher CRF.
#[derive(Debug, Clone)]
pub struct Bisect {
    low: i16,
    high: i16,
    pending: Option<i16>,
}

impl Bisect {
    pub fn new(min: QualityLevel, max: QualityLevel) -> Self {
        Self {
            low: min.crf() as i16,
            high: max.crf() as i16,
            pending: None,
        }
    }
}

impl SearchStrategy for Bisect {
    fn next(&mut self, previous: Option<&Attempt>) -> Option<QualityLevel> {
        if let (Some(tried), Some(attempt)) = (self.pending.take(), previous) {
            if attempt.fits() {
                self.high = tried - 1;
            } else {
                self.low = tried + 1;
            }
        }
        if self.low > self.high {
            return None;
        }
        let mid = self.low + (self.high - self.low) / 2;
        self.pending = Some(mid);
        QualityLevel::new(mid as u8).ok()
    }
}

/// Successful search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The retained artifact, now at the requested output path
    pub output: EncodedFile,
    pub level: QualityLevel,
    pub attempts: Vec<Attempt>,
}

/// Run the search for `source` and leave the winner at `output`
///
/// Success requires `size_bytes <= ceiling_bytes`, with no margin. When no
/// level fits the error is [`MediaError::SizeCeilingUnsatisfiable`]; when
/// every level errored it is [`MediaError::EncodeFailed`]. Both carry the
/// attempt trace.
pub async fn search(
    encoder: &dyn Encoder,
    strategy: &mut dyn SearchStrategy,
    source: &Path,
    plan: &FilterPlan,
    ceiling_bytes: u64,
    output: &Path,
) -> MediaResult<SearchOutcome> {
    let mut guard = ArtifactGuard::default();
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut best: Option<(QualityLevel, EncodedFile)> = None;

    while let Some(level) = strategy.next(attempts.last()) {
        let artifact = artifact_path(output, level);
        guard.track(artifact.clone());

        let outcome = match encoder.encode(source, plan, level, &artifact).await {
            Ok(file) => {
                guard.track(file.path.clone());
                let fits = file.size_bytes <= ceiling_bytes;
                info!(
                    "Attempt at {} produced {} bytes ({:.1} KB, ceiling {} KB)",
                    level,
                    file.size_bytes,
                    file.size_bytes as f64 / 1024.0,
                    ceiling_bytes / 1024
                );
                let size_bytes = file.size_bytes;
                if fits {
                    if let Some((_, previous)) = best.replace((level, file)) {
                        ScratchDir::remove_quietly(&previous.path).await;
                    }
                } else {
                    ScratchDir::remove_quietly(&file.path).await;
                }
                AttemptOutcome::Encoded { size_bytes, fits }
            }
            Err(e) => {
                warn!("Attempt at {} failed: {}", level, e);
                ScratchDir::remove_quietly(&artifact).await;
                AttemptOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        attempts.push(Attempt { level, outcome });
    }

    let Some((level, file)) = best else {
        if attempts.is_empty() {
            return Err(MediaError::InvalidParameter(
                "No quality levels configured".to_string(),
            ));
        }
        if attempts.iter().any(|a| a.size_bytes().is_some()) {
            warn!(
                "No level met the {} KB ceiling after {} attempts",
                ceiling_bytes / 1024,
                attempts.len()
            );
            return Err(MediaError::SizeCeilingUnsatisfiable {
                ceiling_bytes,
                attempts,
            });
        }
        return Err(MediaError::EncodeFailed { attempts });
    };

    tokio::fs::rename(&file.path, output).await?;
    info!("Selected {} at {} bytes", level, file.size_bytes);

    Ok(SearchOutcome {
        output: EncodedFile {
            path: output.to_path_buf(),
            size_bytes: file.size_bytes,
        },
        level,
        attempts,
    })
}

/// `1 - output/input`; undefined for an empty input
pub fn compression_ratio(input_bytes: u64, output_bytes: u64) -> Option<f64> {
    if input_bytes == 0 {
        return None;
    }
    Some(1.0 - output_bytes as f64 / input_bytes as f64)
}

/// `<dir>/<stem>.<level>.<ext>` next to the final output
fn artifact_path(output: &Path, level: QualityLevel) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.{}.{}", stem, level, ext.to_string_lossy()),
        None => format!("{}.{}", stem, level),
    };
    output.with_file_name(name)
}

/// Deletes every tracked artifact when dropped
///
/// Paths that were already removed or renamed are simply not found.
#[derive(Default)]
struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    fn track(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            let _ = std::fs::remove_file(path);
        }
    }
}
