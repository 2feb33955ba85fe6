//! Media library for the Sticker Forge services
//!
//! Turns uploaded GIFs into size-constrained WebM stickers, emoji and
//! previews, and performs the simpler trim/icon edits. All pixel work is done
//! by ffmpeg; this crate plans the filters, drives the quality search and
//! keeps track of the files it creates.

pub mod command;
pub mod converter;
pub mod editor;
pub mod encoder;
pub mod error;
pub mod filter_planner;
pub mod models;
pub mod probe;
pub mod quality_search;
pub mod toolchain;

pub use converter::{Conversion, ConvertOptions, Converter, SizeCeiling};
pub use editor::{Editor, IconScaling, TrimRequest};
pub use encoder::{Encoder, FfmpegEncoder};
pub use error::{ErrorKind, MediaError, MediaResult};
pub use models::{Background, ConversionMode, EncodedFile, MediaInfo, QualityLevel};
pub use probe::{FfprobeProbe, MediaProbe};
pub use quality_search::{Attempt, AttemptOutcome, Bisect, LinearLadder, SearchStrategy};
pub use toolchain::Toolchain;
