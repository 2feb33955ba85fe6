use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use api::{AppConfig, AppState, create_router};
use common::ScratchDir;
use media::filter_planner::FilterPlan;
use media::{
    Converter, Editor, EncodedFile, Encoder, MediaInfo, MediaProbe, MediaResult, QualityLevel,
    Toolchain,
};

const BOUNDARY: &str = "stickerforge-test-boundary";

struct StubProbe;

#[async_trait]
impl MediaProbe for StubProbe {
    async fn probe(&self, _path: &Path) -> MediaResult<MediaInfo> {
        Ok(MediaInfo {
            width: 480,
            height: 270,
            duration_secs: 5.0,
            frame_rate: 25.0,
        })
    }
}

/// Writes `(70 - crf) * kb_per_step` KB per attempt
struct StubEncoder {
    kb_per_step: u64,
}

#[async_trait]
impl Encoder for StubEncoder {
    async fn encode(
        &self,
        _source: &Path,
        _plan: &FilterPlan,
        level: QualityLevel,
        artifact: &Path,
    ) -> MediaResult<EncodedFile> {
        let size = (70 - level.crf() as u64) * self.kb_per_step * 1024;
        tokio::fs::write(artifact, vec![0u8; size as usize]).await?;
        Ok(EncodedFile {
            path: artifact.to_path_buf(),
            size_bytes: size,
        })
    }
}

struct TestApp {
    router: Router,
    scratch: TempDir,
    // holds the fake ffmpeg script for editing apps
    _bin: Option<TempDir>,
}

fn app(kb_per_step: u64) -> TestApp {
    build(kb_per_step, AppConfig::default(), false)
}

/// App whose editor runs a shell stand-in for ffmpeg that writes a small
/// file to its last argument
#[cfg(unix)]
fn editing_app() -> TestApp {
    build(4, AppConfig::default(), true)
}

fn build(kb_per_step: u64, config: AppConfig, with_editor: bool) -> TestApp {
    let scratch = tempfile::tempdir().unwrap();
    let config = AppConfig {
        scratch_dir: scratch.path().to_path_buf(),
        ..config
    };
    let converter = Converter::new(Arc::new(StubProbe), Arc::new(StubEncoder { kb_per_step }));
    let mut state = AppState::new(config, ScratchDir::open(scratch.path()).unwrap(), None)
        .with_converter(converter);

    let bin = if with_editor {
        let bin = tempfile::tempdir().unwrap();
        state = state.with_editor(Editor::new(fake_ffmpeg(bin.path())));
        Some(bin)
    } else {
        None
    };

    TestApp {
        router: create_router(state),
        scratch,
        _bin: bin,
    }
}

#[cfg(unix)]
fn fake_ffmpeg(dir: &Path) -> Toolchain {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(
        &path,
        "#!/bin/sh\nfor last; do :; done\nprintf EDITED > \"$last\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    Toolchain::from_paths(&path, &path)
}

#[cfg(not(unix))]
fn fake_ffmpeg(dir: &Path) -> Toolchain {
    Toolchain::from_paths(dir.join("ffmpeg"), dir.join("ffprobe"))
}

fn multipart(files: &[(&str, &str, &[u8])], fields: &[(&str, &str)]) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (field, file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn scratch_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_health_reports_tools() {
    let app = app(4);
    let response = app.router.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ffmpeg_available"], false);
    assert_eq!(body["converter_available"], true);
    assert_eq!(body["gif_editor_available"], false);
    assert_eq!(body["icon_converter_available"], false);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = app(4);
    let response = app.router.oneshot(get("/api/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Endpoint not found");
}

#[tokio::test]
async fn test_index_page() {
    let app = app(4);
    let response = app.router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_convert_then_download() {
    let app = app(4);
    let gif = vec![7u8; 200 * 1024];
    let body = multipart(&[("file", "my cat.gif", &gif)], &[("max_size", "128")]);

    let response = app
        .router
        .clone()
        .oneshot(post("/api/convert", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 140 KB at crf 35, 120 KB at crf 40
    let report = json_body(response).await;
    assert_eq!(report["success"], true);
    assert_eq!(report["crf"], 40);
    assert_eq!(report["mode"], "sticker");
    assert_eq!(report["max_size_kb"], 128);
    assert_eq!(report["original_filename"], "my_cat.gif");
    assert_eq!(report["output_filename"], "my_cat_sticker.webm");
    assert_eq!(report["output_size_bytes"], 120 * 1024);
    assert_eq!(report["compression_ratio"], 40.0);
    assert_eq!(report["attempts"].as_array().unwrap().len(), 2);

    let id = report["download_id"].as_str().unwrap().to_string();
    assert_eq!(scratch_files(&app.scratch), vec![format!("{id}_output.webm")]);

    let response = app
        .router
        .oneshot(get(&format!("/api/download/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/webm");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.len(), 120 * 1024);
}

#[tokio::test]
async fn test_convert_rejects_non_gif() {
    let app = app(4);
    let body = multipart(&[("file", "photo.png", b"png")], &[]);

    let response = app.router.oneshot(post("/api/convert", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Only GIF files are allowed");
    assert!(scratch_files(&app.scratch).is_empty());
}

#[tokio::test]
async fn test_convert_requires_file() {
    let app = app(4);
    let body = multipart(&[], &[("mode", "emoji")]);

    let response = app.router.oneshot(post("/api/convert", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file provided");
}

#[tokio::test]
async fn test_convert_rejects_bad_parameters() {
    let app = app(4);

    let body = multipart(&[("file", "a.gif", b"GIF89a")], &[("max_size", "10")]);
    let response = app
        .router
        .clone()
        .oneshot(post("/api/convert", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid max_size. Must be between 64 and 2048 KB"
    );

    let body = multipart(&[("file", "a.gif", b"GIF89a")], &[("mode", "banner")]);
    let response = app
        .router
        .clone()
        .oneshot(post("/api/convert", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = multipart(&[("file", "a.gif", b"GIF89a")], &[("max_size", "lots")]);
    let response = app.router.oneshot(post("/api/convert", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(scratch_files(&app.scratch).is_empty());
}

#[tokio::test]
async fn test_convert_unsatisfiable_ceiling() {
    // Smallest attempt is 700 KB
    let app = app(100);
    let body = multipart(&[("file", "big.gif", b"GIF89a")], &[("max_size", "64")]);

    let response = app.router.oneshot(post("/api/convert", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Conversion failed. Could not meet 64 KB limit.");
    assert_eq!(body["attempts"].as_array().unwrap().len(), 7);
    assert!(scratch_files(&app.scratch).is_empty());
}

#[tokio::test]
async fn test_bulk_reports_each_file() {
    let app = app(4);
    let body = multipart(
        &[
            ("files", "one.gif", b"GIF89a"),
            ("files", "two.GIF", b"GIF89a"),
            ("files", "three.jpg", b"jpg"),
        ],
        &[("max_size", "256"), ("mode", "emoji")],
    );

    let response = app
        .router
        .oneshot(post("/api/convert-bulk", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["successful"], 2);
    assert_eq!(body["failed"], 1);

    let results = body["results"].as_array().unwrap();
    let rejected = results.iter().find(|r| r["filename"] == "three.jpg").unwrap();
    assert_eq!(rejected["success"], false);
    let converted = results.iter().find(|r| r["filename"] == "one.gif").unwrap();
    assert_eq!(converted["output_filename"], "one_emoji.webm");
    assert!(converted["download_id"].is_string());

    // only the two outputs remain
    assert_eq!(scratch_files(&app.scratch).len(), 2);
}

#[tokio::test]
async fn test_preview_returns_webm() {
    let app = app(4);
    let body = multipart(&[("file", "clip.gif", b"GIF89a")], &[]);

    let response = app
        .router
        .oneshot(post("/convert/gif-to-webm", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/webm");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.len(), 140 * 1024);
}

#[tokio::test]
async fn test_download_unknown_id() {
    let app = app(4);

    let response = app
        .router
        .clone()
        .oneshot(get("/api/download/6f1d2c8e-3b7a-4c1e-9a55-0d2f6b8e4a10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "File not found or expired");

    let response = app
        .router
        .oneshot(get("/api/download/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "File not found or expired");
}

#[tokio::test]
async fn test_oversized_upload_is_413() {
    let config = AppConfig {
        max_upload_bytes: 4 * 1024,
        ..AppConfig::default()
    };
    let app = build(4, config, false);
    let gif = vec![7u8; 64 * 1024];
    let body = multipart(&[("file", "huge.gif", &gif)], &[]);

    let response = app.router.oneshot(post("/api/convert", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"], "File too large");
}

#[cfg(unix)]
#[tokio::test]
async fn test_trim_returns_gif_attachment() {
    let app = editing_app();
    let body = multipart(
        &[("file", "clip.gif", b"GIF89a")],
        &[("start", "0"), ("end", "2")],
    );

    let response = app.router.oneshot(post("/edit/trim-gif", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip_trimmed_0.0-2.0.gif\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"EDITED");
}

#[cfg(unix)]
#[tokio::test]
async fn test_trim_rejects_bad_range() {
    let app = editing_app();
    let body = multipart(
        &[("file", "clip.gif", b"GIF89a")],
        &[("start_time", "5"), ("end_time", "2")],
    );

    let response = app.router.oneshot(post("/edit/trim-gif", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(scratch_files(&app.scratch).is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_ping_pong_trim_kept_for_download() {
    let app = editing_app();
    let body = multipart(
        &[("file", "clip.gif", b"GIF89a")],
        &[("start_time", "0.5"), ("end_time", "2"), ("pingpong", "true")],
    );

    let response = app
        .router
        .clone()
        .oneshot(post("/api/trim-gif", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = json_body(response).await;
    assert_eq!(report["ping_pong"], true);
    assert_eq!(report["duration"], 1.5);
    assert_eq!(report["output_filename"], "clip_trimmed_0.5s-2.0s.gif");

    // forward/reversed intermediates and the upload are gone
    let id = report["download_id"].as_str().unwrap().to_string();
    assert_eq!(scratch_files(&app.scratch), vec![format!("{id}_trimmed.gif")]);

    let response = app
        .router
        .oneshot(get(&format!("/api/download/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
}

#[cfg(unix)]
#[tokio::test]
async fn test_icon_returns_png_attachment() {
    let app = editing_app();
    let body = multipart(
        &[("file", "logo.webp", b"RIFF")],
        &[("background", "white"), ("scaling", "cover")],
    );

    let response = app
        .router
        .oneshot(post("/convert/image-to-icon", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"logo_100x100_icon.png\""
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_icon_rejects_unknown_option() {
    let app = editing_app();
    let body = multipart(&[("file", "logo.png", b"png")], &[("scaling", "stretch")]);

    let response = app
        .router
        .oneshot(post("/convert/image-to-icon", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid scaling option");
}

#[tokio::test]
async fn test_edit_endpoints_need_ffmpeg() {
    let app = app(4);
    let body = multipart(&[("file", "a.gif", b"GIF89a")], &[("start", "0"), ("end", "2")]);

    let response = app.router.oneshot(post("/edit/trim-gif", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "FFmpeg not found on server");
}
