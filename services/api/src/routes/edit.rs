//! GIF trimming and icon endpoints

use axum::{
    Json,
    extract::{Multipart, State},
    response::Response,
};
use tracing::info;

use media::{Background, IconScaling, TrimRequest};

use super::{TRIMMED_SUFFIX, serve_file};
use crate::{
    error::{ApiError, ApiResult},
    models::{TrimResponse, to_kb},
    state::AppState,
    upload::UploadForm,
    validation::{GIF_EXTENSIONS, IMAGE_EXTENSIONS, parse_flag, parse_number},
};

const GIF_ONLY: &str = "Only GIF files are allowed";
const INVALID_TIMES: &str = "Invalid time parameters";

/// Trim window from `start`/`end` (or `start_time`/`end_time`) and `pingpong`
fn trim_request(form: &UploadForm) -> ApiResult<TrimRequest> {
    let start = parse_number(form.field_any(&["start", "start_time"]), 0.0, INVALID_TIMES)?;
    let end = parse_number(form.field_any(&["end", "end_time"]), 3.0, INVALID_TIMES)?;
    let ping_pong = parse_flag(form.field_any(&["pingpong", "ping_pong"]));
    Ok(TrimRequest::new(start, end, ping_pong)?)
}

/// Trim a GIF and return it as an attachment
pub async fn trim_gif(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Response> {
    let editor = state.editor()?;
    let form = UploadForm::read(multipart, &state.scratch, "file", GIF_EXTENSIONS).await?;
    let request = trim_request(&form)?;
    let upload = form.into_single(GIF_ONLY)?;

    let output = state.scratch.path_for(upload.id, "edited.gif")?;
    editor
        .trim(&upload.path, &output, request)
        .await
        .map_err(|_| ApiError::ProcessingFailed("GIF trimming failed".to_string()))?;

    let download_name = format!(
        "{}_trimmed_{:.1}-{:.1}.gif",
        upload.stem(),
        request.start_secs(),
        request.end_secs()
    );
    drop(upload);

    serve_file(output, "image/gif", Some(&download_name), state.config.edit_ttl()).await
}

/// Trim a GIF and keep it for `/api/download/{id}`
pub async fn trim_for_download(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<TrimResponse>> {
    let editor = state.editor()?;
    let form = UploadForm::read(multipart, &state.scratch, "file", GIF_EXTENSIONS).await?;
    let request = trim_request(&form)?;
    let upload = form.into_single(GIF_ONLY)?;

    let output = state.scratch.path_for(upload.id, TRIMMED_SUFFIX)?;
    editor
        .trim(&upload.path, &output, request)
        .await
        .map_err(|_| ApiError::ProcessingFailed("GIF trimming failed".to_string()))?;

    let output_size = tokio::fs::metadata(&output)
        .await
        .map_err(common::ScratchError::from)?
        .len();
    info!("Trimmed {} ({} bytes)", upload.file_name, output_size);

    Ok(Json(TrimResponse {
        success: true,
        original_filename: upload.file_name.clone(),
        output_filename: format!(
            "{}_trimmed_{:.1}s-{:.1}s.gif",
            upload.stem(),
            request.start_secs(),
            request.end_secs()
        ),
        original_size_kb: to_kb(upload.size_bytes),
        output_size_kb: to_kb(output_size),
        start_time: request.start_secs(),
        end_time: request.end_secs(),
        duration: request.duration_secs(),
        ping_pong: request.ping_pong(),
        download_id: upload.id,
    }))
}

/// Render an image as a 100x100 PNG attachment
pub async fn image_to_icon(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let editor = state.editor()?;
    let form = UploadForm::read(multipart, &state.scratch, "file", IMAGE_EXTENSIONS).await?;
    let background: Background = form.field("background").unwrap_or("transparent").parse()?;
    let scaling: IconScaling = form.field("scaling").unwrap_or("contain").parse()?;
    let upload = form.into_single(&format!(
        "File type not allowed. Allowed types: {}",
        IMAGE_EXTENSIONS.join(", ")
    ))?;

    let limit = state.config.max_image_upload_bytes;
    if upload.size_bytes > limit {
        return Err(ApiError::BadRequest(format!(
            "File too large. Maximum size for images: {}MB",
            limit / (1024 * 1024)
        )));
    }

    let output = state.scratch.path_for(upload.id, "icon.png")?;
    editor
        .icon(&upload.path, &output, background, scaling)
        .await
        .map_err(|_| ApiError::ProcessingFailed("Image conversion failed".to_string()))?;

    let download_name = format!("{}_100x100_icon.png", upload.stem());
    drop(upload);

    serve_file(output, "image/png", Some(&download_name), state.config.edit_ttl()).await
}
