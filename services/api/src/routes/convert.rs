//! GIF to WebM conversion endpoints

use axum::{
    Json,
    extract::{Multipart, State},
    response::Response,
};
use tracing::{error, info};

use media::{Background, ConversionMode, ConvertOptions, MediaError, SizeCeiling};

use super::{OUTPUT_SUFFIX, serve_file};
use crate::{
    error::{ApiError, ApiResult},
    models::{BulkItem, BulkResponse, ConvertResponse},
    state::AppState,
    upload::UploadForm,
    validation::{GIF_EXTENSIONS, parse_number},
};

const GIF_ONLY: &str = "Only GIF files are allowed";

/// Mode, ceiling and background from the form fields
fn convert_options(form: &UploadForm) -> ApiResult<ConvertOptions> {
    let max_size_kb = parse_number(
        form.field("max_size"),
        SizeCeiling::DEFAULT_KB,
        "Invalid max_size. Must be a whole number of KB",
    )?;
    let mode: ConversionMode = form.field("mode").unwrap_or("sticker").parse()?;
    let background: Background = form.field("background").unwrap_or("transparent").parse()?;

    Ok(ConvertOptions {
        mode,
        ceiling: SizeCeiling::for_mode(mode, max_size_kb)?,
        background,
    })
}

/// Convert one GIF and keep the result for `/api/download/{id}`
pub async fn convert_gif(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConvertResponse>> {
    let converter = state.converter()?;
    let form = UploadForm::read(multipart, &state.scratch, "file", GIF_EXTENSIONS).await?;
    let options = convert_options(&form)?;
    let upload = form.into_single(GIF_ONLY)?;

    let output = state.scratch.path_for(upload.id, OUTPUT_SUFFIX)?;
    let conversion = converter.convert(&upload.path, &output, options).await?;

    info!(
        "Converted {} to {} ({} bytes at {})",
        upload.file_name,
        options.mode,
        conversion.output_size_bytes,
        conversion.level
    );

    Ok(Json(ConvertResponse::new(
        &upload.file_name,
        upload.stem(),
        upload.id,
        options.mode,
        options.ceiling.kb(),
        conversion,
    )))
}

/// Convert every GIF of the `files` field, reporting each one separately
pub async fn convert_bulk(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<BulkResponse>> {
    let converter = state.converter()?;
    let form = UploadForm::read(multipart, &state.scratch, "files", GIF_EXTENSIONS).await?;
    let options = convert_options(&form)?;

    if form.files.is_empty() && form.rejected.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    let mut results: Vec<BulkItem> = form
        .rejected
        .iter()
        .map(|name| BulkItem::failed(name, GIF_ONLY))
        .collect();

    for upload in &form.files {
        let output = state.scratch.path_for(upload.id, OUTPUT_SUFFIX)?;
        let item = match converter.convert(&upload.path, &output, options).await {
            Ok(conversion) => BulkItem::converted(
                &upload.file_name,
                upload.stem(),
                upload.id,
                options.mode,
                &conversion,
            ),
            Err(e) => {
                error!("Bulk conversion of {} failed: {}", upload.file_name, e);
                let message = match e {
                    MediaError::SizeCeilingUnsatisfiable { .. } => e.to_string(),
                    _ => "Conversion failed".to_string(),
                };
                BulkItem::failed(&upload.file_name, message)
            }
        };
        results.push(item);
    }

    let response = BulkResponse::new(results);
    info!(
        "Bulk conversion: {}/{} succeeded",
        response.successful, response.total
    );
    Ok(Json(response))
}

/// Full-duration preview returned directly as `video/webm`
pub async fn preview_webm(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let converter = state.converter()?;
    let form = UploadForm::read(multipart, &state.scratch, "file", GIF_EXTENSIONS).await?;
    let background: Background = form.field("background").unwrap_or("transparent").parse()?;
    let upload = form.into_single(GIF_ONLY)?;

    let options = ConvertOptions {
        mode: ConversionMode::Preview,
        ceiling: SizeCeiling::for_mode(ConversionMode::Preview, SizeCeiling::PREVIEW_KB)?,
        background,
    };
    let output = state.scratch.path_for(upload.id, "preview.webm")?;
    converter.convert(&upload.path, &output, options).await?;
    drop(upload);

    serve_file(output, "video/webm", None, state.config.preview_ttl()).await
}
