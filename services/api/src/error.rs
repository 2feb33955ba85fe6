//! Custom error types for the API service

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media::{ErrorKind, MediaError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload above the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unknown route or expired download
    #[error("Not found: {0}")]
    NotFound(String),

    /// An edit pipeline failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// ffmpeg/ffprobe were not found at startup
    #[error("FFmpeg not found on server")]
    ToolUnavailable,

    /// Conversion or probe error
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Scratch storage error
    #[error(transparent)]
    Scratch(#[from] common::ScratchError),

    /// Malformed multipart body
    #[error(transparent)]
    Multipart(MultipartError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ProcessingFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ToolUnavailable | ApiError::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Media(e) => match e.kind() {
                ErrorKind::InvalidInput | ErrorKind::ConstraintUnmet => StatusCode::BAD_REQUEST,
                ErrorKind::ToolUnavailable | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the client; never contains server paths
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::NotFound(msg)
            | ApiError::ProcessingFailed(msg) => msg.clone(),
            ApiError::ToolUnavailable => "FFmpeg not found on server".to_string(),
            ApiError::Scratch(_) => "Internal server error".to_string(),
            ApiError::Media(e) => media_message(e),
            ApiError::Multipart(_) => "Malformed upload".to_string(),
        }
    }
}

fn media_message(e: &MediaError) -> String {
    match e {
        MediaError::Probe { .. } => "Not a valid GIF file".to_string(),
        MediaError::NoVideoStream(_) => "Uploaded file contains no image frames".to_string(),
        MediaError::InvalidMedia(_) => "Uploaded file has no frames or zero size".to_string(),
        MediaError::InvalidParameter(msg) => msg.clone(),
        MediaError::SizeCeilingUnsatisfiable { ceiling_bytes, .. } => format!(
            "Conversion failed. Could not meet {} KB limit.",
            ceiling_bytes / 1024
        ),
        MediaError::Tool { .. } | MediaError::EncodeFailed { .. } => {
            "Conversion failed".to_string()
        }
        MediaError::ToolUnavailable(_) => "FFmpeg not found on server".to_string(),
        MediaError::Timeout { .. } => "Processing timed out".to_string(),
        MediaError::Io(_) => "Internal server error".to_string(),
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File too large".to_string())
        } else {
            ApiError::Multipart(e)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let mut body = json!({
            "success": false,
            "error": self.public_message(),
        });
        if let ApiError::Media(e) = &self {
            if !e.attempts().is_empty() {
                body["attempts"] = json!(e.attempts());
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
