//! Upload name and form field checks

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ApiError, ApiResult};

/// Extensions accepted by the GIF endpoints
pub const GIF_EXTENSIONS: &[&str] = &["gif"];

/// Extensions accepted by icon conversion
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "svg"];

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9._-]+").expect("Failed to compile filename regex")
    })
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`
///
/// Directory parts are dropped, runs of other characters become `_`, and
/// leading dots or underscores are stripped. Falls back to `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = unsafe_chars().replace_all(base, "_");
    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Case-insensitive extension check
pub fn has_allowed_extension(name: &str, allowed: &[&str]) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| allowed.contains(&ext.as_str()))
}

/// Name without its last extension
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// `"true"` in any case enables a flag; everything else disables it
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Parse an optional numeric field, falling back to `default` when absent
pub fn parse_number<T: std::str::FromStr>(
    value: Option<&str>,
    default: T,
    message: &str,
) -> ApiResult<T> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ApiError::BadRequest(message.to_string())),
    }
}
