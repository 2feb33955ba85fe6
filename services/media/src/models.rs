use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Shape of a probed source file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub frame_rate: f64,
}

impl MediaInfo {
    /// True when the file cannot be planned: no pixels or no running time
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0 || self.duration_secs <= 0.0
    }
}

/// What a GIF is being turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Longest side 512px, at most 3 seconds
    Sticker,
    /// 100x100 padded canvas, at most 3 seconds
    Emoji,
    /// Sticker scaling, full duration, generous size ceiling
    Preview,
}

impl ConversionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Sticker => "sticker",
            ConversionMode::Emoji => "emoji",
            ConversionMode::Preview => "preview",
        }
    }

    /// Whether the output duration is capped at three seconds
    pub fn caps_duration(&self) -> bool {
        !matches!(self, ConversionMode::Preview)
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sticker" => Ok(ConversionMode::Sticker),
            "emoji" => Ok(ConversionMode::Emoji),
            "preview" => Ok(ConversionMode::Preview),
            other => Err(MediaError::InvalidParameter(format!(
                "Invalid mode \"{}\". Must be \"sticker\", \"emoji\", or \"preview\"",
                other
            ))),
        }
    }
}

/// Fill used where the image does not cover the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    Transparent,
    White,
    Black,
}

impl Background {
    /// Color syntax understood by the ffmpeg `pad` filter
    pub fn pad_color(&self) -> &'static str {
        match self {
            Background::Transparent => "black@0",
            Background::White => "white",
            Background::Black => "black",
        }
    }

    /// Hex RRGGBB[AA] form used for PNG icons
    pub fn hex(&self) -> &'static str {
        match self {
            Background::Transparent => "00000000",
            Background::White => "ffffff",
            Background::Black => "000000",
        }
    }
}

impl FromStr for Background {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transparent" => Ok(Background::Transparent),
            "white" => Ok(Background::White),
            "black" => Ok(Background::Black),
            _ => Err(MediaError::InvalidParameter(
                "Invalid background option".to_string(),
            )),
        }
    }
}

/// One point on the encoder's quality/size curve (a VP9 CRF value)
///
/// Higher values compress harder and are expected to never produce a larger
/// file than lower values for the same input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualityLevel(u8);

impl QualityLevel {
    pub const MAX: u8 = 63;

    /// Default ladder, from "fits most inputs" to "smallest possible"
    pub const DEFAULT_LADDER: [QualityLevel; 7] = [
        QualityLevel(35),
        QualityLevel(40),
        QualityLevel(45),
        QualityLevel(50),
        QualityLevel(55),
        QualityLevel(60),
        QualityLevel(63),
    ];

    pub fn new(crf: u8) -> MediaResult<Self> {
        if crf > Self::MAX {
            return Err(MediaError::InvalidParameter(format!(
                "CRF {} is outside 0..={}",
                crf,
                Self::MAX
            )));
        }
        Ok(Self(crf))
    }

    pub fn crf(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for QualityLevel {
    type Error = MediaError;

    fn try_from(crf: u8) -> Result<Self, Self::Error> {
        Self::new(crf)
    }
}

impl From<QualityLevel> for u8 {
    fn from(level: QualityLevel) -> Self {
        level.0
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crf{}", self.0)
    }
}

/// An artifact written by the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}
