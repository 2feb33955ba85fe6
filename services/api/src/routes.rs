//! API service routes

use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderValue, Method, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use common::ScratchDir;

use crate::{
    config::AppConfig,
    error::{ApiError, ApiResult},
    models::HealthResponse,
    state::AppState,
};

pub mod convert;
pub mod edit;

/// Suffix of converted outputs kept for download
pub const OUTPUT_SUFFIX: &str = "output.webm";
/// Suffix of trimmed GIFs kept for download
pub const TRIMMED_SUFFIX: &str = "trimmed.gif";

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/convert", post(convert::convert_gif))
        .route("/api/convert-bulk", post(convert::convert_bulk))
        .route("/api/trim-gif", post(edit::trim_for_download))
        .route("/api/download/:file_id", get(download_file))
        .route("/convert/gif-to-webm", post(convert::preview_webm))
        .route("/edit/trim-gif", post(edit::trim_gif))
        .route("/convert/image-to-icon", post(edit::image_to_icon))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match config.allowed_origin.as_deref() {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
            Err(_) => {
                warn!("Ignoring invalid allowed_origin {:?}; allowing any origin", origin);
                layer.allow_origin(Any)
            }
        },
        None => layer.allow_origin(Any),
    }
}

/// Status page
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let status = |available: bool| if available { "available" } else { "unavailable" };
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sticker Forge</title></head>
<body>
<h1>Sticker Forge</h1>
<p>GIF to WebM converter: {}</p>
<p>GIF editor and icon converter: {}</p>
<ul>
<li>POST /api/convert</li>
<li>POST /api/convert-bulk</li>
<li>POST /api/trim-gif</li>
<li>GET /api/download/&lt;id&gt;</li>
<li>POST /convert/gif-to-webm</li>
<li>POST /edit/trim-gif</li>
<li>POST /convert/image-to-icon</li>
<li>GET /api/health</li>
</ul>
</body>
</html>
"#,
        status(state.converter_available()),
        status(state.editor_available()),
    ))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ffmpeg_available = match &state.toolchain {
        Some(tools) => tools.check().await,
        None => false,
    };
    let editor_available = state.editor_available() && ffmpeg_available;

    Json(HealthResponse {
        status: "healthy",
        ffmpeg_available,
        converter_available: state.converter_available(),
        gif_editor_available: editor_available,
        icon_converter_available: editor_available,
    })
}

/// Serve a converted or trimmed file once, then schedule its removal
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let file_id = Uuid::parse_str(&file_id)
        .map_err(|_| ApiError::NotFound("File not found or expired".to_string()))?;
    let short_id: String = file_id.to_string().chars().take(8).collect();
    let candidates = [
        (OUTPUT_SUFFIX, "video/webm", format!("converted_sticker_{}.webm", short_id)),
        (TRIMMED_SUFFIX, "image/gif", format!("trimmed_gif_{}.gif", short_id)),
    ];

    for (suffix, content_type, download_name) in candidates {
        let path = state.scratch.path_for(file_id, suffix)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }

        info!("Serving download {}", path.display());
        let ttl = state.config.download_ttl();
        return serve_file(path, content_type, Some(&download_name), ttl).await;
    }

    Err(ApiError::NotFound("File not found or expired".to_string()))
}

/// Read a scratch file into a response and delete it after `ttl`
pub async fn serve_file(
    path: PathBuf,
    content_type: &'static str,
    download_name: Option<&str>,
    ttl: std::time::Duration,
) -> ApiResult<Response> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(common::ScratchError::from)?;
    ScratchDir::schedule_removal(path, ttl);
    Ok(file_response(bytes, content_type, download_name))
}

fn file_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    download_name: Option<&str>,
) -> Response {
    match download_name {
        Some(name) => (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", name),
                ),
            ],
            bytes,
        )
            .into_response(),
        None => ([(header::CONTENT_TYPE, content_type.to_string())], bytes).into_response(),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}
