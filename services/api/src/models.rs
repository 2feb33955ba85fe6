//! API models for response payloads

use serde::Serialize;
use uuid::Uuid;

use media::{Attempt, Conversion, ConversionMode};

/// Round to one decimal place for display
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Bytes to kilobytes, one decimal place
pub fn to_kb(bytes: u64) -> f64 {
    round1(bytes as f64 / 1024.0)
}

/// Response for the health endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ffmpeg_available: bool,
    pub converter_available: bool,
    pub gif_editor_available: bool,
    pub icon_converter_available: bool,
}

/// Report of a single conversion
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub original_filename: String,
    pub output_filename: String,
    pub original_size_bytes: u64,
    pub output_size_bytes: u64,
    pub original_size_kb: f64,
    pub output_size_kb: f64,
    /// Percent saved; omitted for an empty source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    pub mode: ConversionMode,
    pub max_size_kb: u64,
    pub download_id: Uuid,
    pub original_width: u32,
    pub original_height: u32,
    pub original_duration: f64,
    pub output_width: Option<u32>,
    pub output_height: Option<u32>,
    pub output_duration: Option<f64>,
    pub crf: u8,
    pub attempts: Vec<Attempt>,
}

impl ConvertResponse {
    pub fn new(
        original_filename: &str,
        stem: &str,
        download_id: Uuid,
        mode: ConversionMode,
        max_size_kb: u64,
        conversion: Conversion,
    ) -> Self {
        Self {
            success: true,
            original_filename: original_filename.to_string(),
            output_filename: format!("{}_{}.webm", stem, mode),
            original_size_bytes: conversion.source_size_bytes,
            output_size_bytes: conversion.output_size_bytes,
            original_size_kb: to_kb(conversion.source_size_bytes),
            output_size_kb: to_kb(conversion.output_size_bytes),
            compression_ratio: conversion.compression_ratio().map(|r| round1(r * 100.0)),
            mode,
            max_size_kb,
            download_id,
            original_width: conversion.source.width,
            original_height: conversion.source.height,
            original_duration: round1(conversion.source.duration_secs),
            output_width: conversion.output.map(|o| o.width),
            output_height: conversion.output.map(|o| o.height),
            output_duration: conversion.output.map(|o| round1(o.duration_secs)),
            crf: conversion.level.crf(),
            attempts: conversion.attempts,
        }
    }
}

/// One file of a bulk conversion
#[derive(Debug, Serialize)]
pub struct BulkItem {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItem {
    pub fn converted(
        filename: &str,
        stem: &str,
        download_id: Uuid,
        mode: ConversionMode,
        conversion: &Conversion,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            success: true,
            output_filename: Some(format!("{}_{}.webm", stem, mode)),
            original_size_kb: Some(to_kb(conversion.source_size_bytes)),
            output_size_kb: Some(to_kb(conversion.output_size_bytes)),
            compression_ratio: conversion.compression_ratio().map(|r| round1(r * 100.0)),
            download_id: Some(download_id),
            error: None,
        }
    }

    pub fn failed(filename: &str, error: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            output_filename: None,
            original_size_kb: None,
            output_size_kb: None,
            compression_ratio: None,
            download_id: None,
            error: Some(error.into()),
        }
    }
}

/// Report of a bulk conversion
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn new(results: Vec<BulkItem>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}

/// Report of a trim kept for download
#[derive(Debug, Serialize)]
pub struct TrimResponse {
    pub success: bool,
    pub original_filename: String,
    pub output_filename: String,
    pub original_size_kb: f64,
    pub output_size_kb: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub ping_pong: bool,
    pub download_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(to_kb(1536), 1.5);
        assert_eq!(to_kb(0), 0.0);
    }

    #[test]
    fn test_bulk_totals() {
        let response = BulkResponse::new(vec![
            BulkItem::failed("a.png", "Only GIF files are allowed"),
            BulkItem::failed("b.gif", "Conversion failed"),
        ]);
        assert_eq!(response.total, 2);
        assert_eq!(response.successful, 0);
        assert_eq!(response.failed, 2);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["results"][0].get("download_id").is_none());
        assert_eq!(json["results"][0]["error"], "Only GIF files are allowed");
    }
}
