//! Single-pass edits: GIF trimming, ping-pong loops and PNG icons
//!
//! Unlike conversions there is no search here; each edit is one fixed ffmpeg
//! pipeline (three for ping-pong) and either succeeds or fails.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{error, info};

use common::ScratchDir;

use crate::error::{MediaError, MediaResult};
use crate::models::Background;
use crate::toolchain::Toolchain;

/// Longest clip a trim may keep
pub const MAX_TRIM_SECS: f64 = 60.0;
/// Side of generated icons
pub const ICON_EDGE: u32 = 100;

const PALETTE_FILTER: &str = "split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";
const CONCAT_FILTER: &str =
    "[0:v][1:v]concat=n=2:v=1:a=0[v];[v]split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";

/// A validated trim window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRequest {
    start_secs: f64,
    end_secs: f64,
    ping_pong: bool,
}

impl TrimRequest {
    /// Requires `0 <= start < end <= start + 60`
    pub fn new(start_secs: f64, end_secs: f64, ping_pong: bool) -> MediaResult<Self> {
        let valid = start_secs.is_finite()
            && end_secs.is_finite()
            && start_secs >= 0.0
            && end_secs > start_secs
            && end_secs - start_secs <= MAX_TRIM_SECS;
        if !valid {
            return Err(MediaError::InvalidParameter(
                "Invalid time range. Must be 0 ≤ start < end ≤ start+60".to_string(),
            ));
        }
        Ok(Self {
            start_secs,
            end_secs,
            ping_pong,
        })
    }

    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    pub fn end_secs(&self) -> f64 {
        self.end_secs
    }

    pub fn ping_pong(&self) -> bool {
        self.ping_pong
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// How an image is fitted into the icon square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconScaling {
    /// Whole image visible, padded with the background
    #[default]
    Contain,
    /// Square filled, overflow cropped
    Cover,
}

impl FromStr for IconScaling {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contain" => Ok(IconScaling::Contain),
            "cover" => Ok(IconScaling::Cover),
            _ => Err(MediaError::InvalidParameter(
                "Invalid scaling option".to_string(),
            )),
        }
    }
}

/// ffmpeg filter producing an [`ICON_EDGE`] square
pub fn icon_filter(background: Background, scaling: IconScaling) -> String {
    let edge = ICON_EDGE;
    match scaling {
        IconScaling::Contain => format!(
            "scale={edge}:{edge}:force_original_aspect_ratio=decrease,pad={edge}:{edge}:(ow-iw)/2:(oh-ih)/2:color={}",
            background.hex()
        ),
        IconScaling::Cover => {
            format!("scale={edge}:{edge}:force_original_aspect_ratio=increase,crop={edge}:{edge}")
        }
    }
}

/// Runs the single-pass edit pipelines
#[derive(Debug, Clone)]
pub struct Editor {
    tools: Toolchain,
}

impl Editor {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    /// Cut `[start, end)` out of a GIF, optionally appending it reversed
    pub async fn trim(&self, source: &Path, output: &Path, request: TrimRequest) -> MediaResult<()> {
        info!(
            "Trimming {} to {:.1}-{:.1}s (ping-pong: {})",
            source.display(),
            request.start_secs,
            request.end_secs,
            request.ping_pong
        );

        let result = if request.ping_pong {
            self.trim_ping_pong(source, output, request).await
        } else {
            self.tools
                .ffmpeg()
                .args(["-y", "-i"])
                .arg(source.to_string_lossy())
                .args(trim_window(request))
                .args(["-vf", PALETTE_FILTER])
                .arg(output.to_string_lossy())
                .execute()
                .await
                .map(|_| ())
        };

        discard_on_failure(result, output).await
    }

    async fn trim_ping_pong(
        &self,
        source: &Path,
        output: &Path,
        request: TrimRequest,
    ) -> MediaResult<()> {
        let forward = sibling(output, "forward");
        let reversed = sibling(output, "reversed");

        let result = async {
            self.tools
                .ffmpeg()
                .args(["-y", "-i"])
                .arg(source.to_string_lossy())
                .args(trim_window(request))
                .arg(forward.to_string_lossy())
                .execute()
                .await?;

            self.tools
                .ffmpeg()
                .args(["-y", "-i"])
                .arg(forward.to_string_lossy())
                .args(["-vf", "reverse"])
                .arg(reversed.to_string_lossy())
                .execute()
                .await?;

            self.tools
                .ffmpeg()
                .args(["-y", "-i"])
                .arg(forward.to_string_lossy())
                .arg("-i")
                .arg(reversed.to_string_lossy())
                .args(["-filter_complex", CONCAT_FILTER])
                .arg(output.to_string_lossy())
                .execute()
                .await
                .map(|_| ())
        }
        .await;

        ScratchDir::remove_quietly(&forward).await;
        ScratchDir::remove_quietly(&reversed).await;
        result
    }

    /// Render any image as a 100x100 PNG
    pub async fn icon(
        &self,
        source: &Path,
        output: &Path,
        background: Background,
        scaling: IconScaling,
    ) -> MediaResult<()> {
        info!(
            "Converting {} to {}x{} icon ({:?}, {:?})",
            source.display(),
            ICON_EDGE,
            ICON_EDGE,
            background,
            scaling
        );

        let result = self
            .tools
            .ffmpeg()
            .args(["-y", "-i"])
            .arg(source.to_string_lossy())
            .arg("-vf")
            .arg(icon_filter(background, scaling))
            .args(["-f", "png"])
            .arg(output.to_string_lossy())
            .execute()
            .await
            .map(|_| ());

        discard_on_failure(result, output).await
    }
}

fn trim_window(request: TrimRequest) -> [String; 4] {
    [
        "-ss".to_string(),
        request.start_secs.to_string(),
        "-t".to_string(),
        request.duration_secs().to_string(),
    ]
}

/// `<dir>/<stem>.<tag>.gif` next to `output`
fn sibling(output: &Path, tag: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "edit".to_string());
    output.with_file_name(format!("{}.{}.gif", stem, tag))
}

async fn discard_on_failure(result: MediaResult<()>, output: &Path) -> MediaResult<()> {
    if let Err(e) = &result {
        error!("Edit of {} failed: {}", output.display(), e);
        ScratchDir::remove_quietly(output).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_request_validation() {
        assert!(TrimRequest::new(0.0, 3.0, false).is_ok());
        assert!(TrimRequest::new(10.0, 70.0, true).is_ok());
        assert!(TrimRequest::new(-1.0, 3.0, false).is_err());
        assert!(TrimRequest::new(3.0, 3.0, false).is_err());
        assert!(TrimRequest::new(0.0, 60.5, false).is_err());
        assert!(TrimRequest::new(f64::NAN, 1.0, false).is_err());
    }

    #[test]
    fn test_trim_duration() {
        let request = TrimRequest::new(1.5, 4.0, false).unwrap();
        assert_eq!(request.duration_secs(), 2.5);
        assert_eq!(trim_window(request), ["-ss", "1.5", "-t", "2.5"].map(String::from));
    }

    #[test]
    fn test_icon_filters() {
        assert_eq!(
            icon_filter(Background::White, IconScaling::Contain),
            "scale=100:100:force_original_aspect_ratio=decrease,pad=100:100:(ow-iw)/2:(oh-ih)/2:color=ffffff"
        );
        assert_eq!(
            icon_filter(Background::Black, IconScaling::Cover),
            "scale=100:100:force_original_aspect_ratio=increase,crop=100:100"
        );
    }

    #[test]
    fn test_icon_scaling_parse() {
        assert_eq!("cover".parse::<IconScaling>().unwrap(), IconScaling::Cover);
        assert!("stretch".parse::<IconScaling>().is_err());
    }

    #[test]
    fn test_sibling_paths() {
        assert_eq!(
            sibling(Path::new("/tmp/id_trimmed.gif"), "reversed"),
            PathBuf::from("/tmp/id_trimmed.reversed.gif")
        );
    }

    /// Shell stand-in for ffmpeg that writes a tiny GIF to its last argument
    /// after running `prelude`
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, prelude: &str) -> Toolchain {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        let script = format!(
            "#!/bin/sh\n{prelude}\nfor last; do :; done\nprintf GIF89a > \"$last\"\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Toolchain::from_paths(&path, &path)
    }

    #[cfg(unix)]
    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ping_pong_removes_intermediates() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let output = scratch.path().join("id_trimmed.gif");

        let editor = Editor::new(fake_ffmpeg(bin.path(), ""));
        let request = TrimRequest::new(0.5, 2.0, true).unwrap();
        editor
            .trim(Path::new("in.gif"), &output, request)
            .await
            .unwrap();

        assert_eq!(file_names(scratch.path()), vec!["id_trimmed.gif"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_ping_pong_removes_everything() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let output = scratch.path().join("id_trimmed.gif");

        // forward and reverse passes succeed, the concat pass fails
        let editor = Editor::new(fake_ffmpeg(
            bin.path(),
            "case \"$*\" in *concat*) echo concat failed >&2; exit 1;; esac",
        ));
        let request = TrimRequest::new(0.0, 1.0, true).unwrap();
        let result = editor.trim(Path::new("in.gif"), &output, request).await;

        assert!(result.is_err());
        assert!(file_names(scratch.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_trim_writes_output() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let output = scratch.path().join("id_edited.gif");

        let editor = Editor::new(fake_ffmpeg(bin.path(), ""));
        let request = TrimRequest::new(0.0, 3.0, false).unwrap();
        editor
            .trim(Path::new("in.gif"), &output, request)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"GIF89a");
    }

    #[tokio::test]
    async fn test_failed_icon_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("icon.png");
        std::fs::write(&output, b"partial").unwrap();

        let editor = Editor::new(Toolchain::from_paths("/nonexistent/ffmpeg", "/nonexistent/ffprobe"));
        let result = editor
            .icon(Path::new("in.png"), &output, Background::Transparent, IconScaling::Contain)
            .await;

        assert!(result.is_err());
        assert!(!output.exists());
    }
}
