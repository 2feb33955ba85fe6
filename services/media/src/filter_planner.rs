//! Derives the scale/pad/frame-rate/duration instructions for one conversion
//!
//! The plan is computed once per request and reused unchanged by every
//! quality attempt, so all attempts differ only in compression.

use serde::Serialize;

use crate::models::{Background, ConversionMode, MediaInfo};

/// Long edge of sticker and preview output
pub const STICKER_EDGE: u32 = 512;
/// Side of the square emoji canvas
pub const EMOJI_CANVAS: u32 = 100;
/// Longest sticker/emoji running time
pub const MAX_CLIP_SECS: f64 = 3.0;
/// Sources faster than this are resampled down to it
pub const MAX_FRAME_RATE: f64 = 30.0;

/// Structured scaling step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleOp {
    /// Scale to exactly these dimensions, aspect preserved
    Fit { width: u32, height: u32 },
    /// Scale into a box, then center on a square canvas
    FitPad {
        content_width: u32,
        content_height: u32,
        canvas: u32,
        x: u32,
        y: u32,
        background: Background,
    },
}

impl ScaleOp {
    /// Dimensions of the frames the encoder receives
    pub fn output_size(&self) -> (u32, u32) {
        match *self {
            ScaleOp::Fit { width, height } => (width, height),
            ScaleOp::FitPad { canvas, .. } => (canvas, canvas),
        }
    }

    fn filter(&self) -> String {
        match *self {
            ScaleOp::Fit { width, height } => format!("scale={}:{}", width, height),
            ScaleOp::FitPad {
                content_width,
                content_height,
                canvas,
                x,
                y,
                background,
            } => format!(
                "scale={}:{},pad={}:{}:{}:{}:color={}",
                content_width,
                content_height,
                canvas,
                canvas,
                x,
                y,
                background.pad_color()
            ),
        }
    }
}

/// Everything applied uniformly across the quality attempts of one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterPlan {
    pub scale: ScaleOp,
    pub duration_cap_secs: f64,
    /// `Some` only when the source is faster than [`MAX_FRAME_RATE`]
    pub frame_rate_cap: Option<f64>,
}

impl FilterPlan {
    /// Render as an ffmpeg `-vf` filter graph
    pub fn filter_graph(&self) -> String {
        let mut filters = vec![self.scale.filter()];
        if let Some(fps) = self.frame_rate_cap {
            filters.push(format!("fps={}", fps));
        }
        filters.join(",")
    }
}

/// Compute the plan for a probed source
///
/// Callers reject degenerate media first; zero sizes are clamped only to keep
/// the arithmetic defined.
pub fn plan(info: &MediaInfo, mode: ConversionMode, background: Background) -> FilterPlan {
    let width = info.width.max(1);
    let height = info.height.max(1);

    let scale = match mode {
        ConversionMode::Emoji => fit_pad(width, height, EMOJI_CANVAS, background),
        ConversionMode::Sticker | ConversionMode::Preview => {
            let (width, height) = fit_long_edge(width, height, STICKER_EDGE);
            ScaleOp::Fit { width, height }
        }
    };

    let duration_cap_secs = if mode.caps_duration() {
        info.duration_secs.min(MAX_CLIP_SECS)
    } else {
        info.duration_secs
    };

    let frame_rate_cap = (info.frame_rate > MAX_FRAME_RATE).then_some(MAX_FRAME_RATE);

    FilterPlan {
        scale,
        duration_cap_secs,
        frame_rate_cap,
    }
}

/// Long side becomes exactly `edge`; the other keeps the aspect ratio,
/// rounded to an even pixel count and never above `edge`.
fn fit_long_edge(width: u32, height: u32, edge: u32) -> (u32, u32) {
    if width >= height {
        let scaled = edge as f64 * height as f64 / width as f64;
        (edge, round_even(scaled).min(edge))
    } else {
        let scaled = edge as f64 * width as f64 / height as f64;
        (round_even(scaled).min(edge), edge)
    }
}

/// Shrink into a `canvas` square (never enlarge), then center.
fn fit_pad(width: u32, height: u32, canvas: u32, background: Background) -> ScaleOp {
    let factor = (canvas as f64 / width as f64)
        .min(canvas as f64 / height as f64)
        .min(1.0);
    let content_width = round_even(width as f64 * factor).min(canvas);
    let content_height = round_even(height as f64 * factor).min(canvas);

    ScaleOp::FitPad {
        content_width,
        content_height,
        canvas,
        x: (canvas - content_width) / 2,
        y: (canvas - content_height) / 2,
        background,
    }
}

fn round_even(value: f64) -> u32 {
    let even = (value / 2.0).round() * 2.0;
    (even as u32).max(2)
}
