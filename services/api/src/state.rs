//! Application state shared across handlers

use std::sync::Arc;

use common::ScratchDir;
use media::{Converter, Editor, Toolchain};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};

/// Application state shared across handlers
///
/// Converter and editor are absent when ffmpeg/ffprobe could not be located
/// at startup; the endpoints needing them then answer with a tool error.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scratch: ScratchDir,
    pub toolchain: Option<Toolchain>,
    converter: Option<Converter>,
    editor: Option<Editor>,
}

impl AppState {
    pub fn new(config: AppConfig, scratch: ScratchDir, toolchain: Option<Toolchain>) -> Self {
        let converter = toolchain.clone().map(Converter::with_toolchain);
        let editor = toolchain.clone().map(Editor::new);
        Self {
            config: Arc::new(config),
            scratch,
            toolchain,
            converter,
            editor,
        }
    }

    /// Replace the converter, e.g. with one using a different prober or encoder
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_editor(mut self, editor: Editor) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn converter(&self) -> ApiResult<&Converter> {
        self.converter.as_ref().ok_or(ApiError::ToolUnavailable)
    }

    pub fn editor(&self) -> ApiResult<&Editor> {
        self.editor.as_ref().ok_or(ApiError::ToolUnavailable)
    }

    pub fn converter_available(&self) -> bool {
        self.converter.is_some()
    }

    pub fn editor_available(&self) -> bool {
        self.editor.is_some()
    }
}
