//! Image plumbing for the desktop app: data-URI packing for uploads,
//! preview decoding for display, and clipboard/save helpers.

use std::path::Path;

use arboard::{Clipboard, ImageData};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;

#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// MIME type for a local path, only when it names an image.
pub fn image_mime_for_path(path: &Path) -> Option<String> {
    let mime = mime_guess::from_path(path).first_raw()?;
    mime.starts_with("image/").then(|| mime.to_string())
}

pub fn encode_image_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Splits a `data:{mime};base64,{payload}` URI into its MIME type and
/// decoded bytes. Anything else is rejected.
pub fn decode_data_uri(data_uri: &str) -> Result<(String, Vec<u8>), String> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| "data URI payload is not base64".to_string())?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|err| format!("invalid base64 payload: {err}"))?;
    Ok((mime.to_string(), bytes))
}

/// Decodes image bytes into an RGBA buffer capped at 1024px on the longer
/// edge. Full-quality bytes stay untouched for save/copy paths.
pub fn decode_preview_image(bytes: &[u8]) -> Result<PreviewImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = dynamic.thumbnail(1024, 1024).to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}

pub fn decode_image_for_clipboard(bytes: &[u8]) -> Result<(Vec<u8>, usize, usize), String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    Ok((
        rgba.as_raw().to_vec(),
        rgba.width() as usize,
        rgba.height() as usize,
    ))
}

pub fn write_clipboard_image(rgba: &[u8], width: usize, height: usize) -> Result<(), String> {
    let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_image(ImageData {
            width,
            height,
            bytes: std::borrow::Cow::Owned(rgba.to_vec()),
        })
        .map_err(|err| err.to_string())
}

/// Default file name offered when saving a received image.
pub fn suggested_image_file_name(mime: &str) -> String {
    image_file_name_at(mime, Utc::now().timestamp_millis())
}

fn image_file_name_at(mime: &str, timestamp_millis: i64) -> String {
    format!(
        "chat-image-{timestamp_millis}.{}",
        extension_for_image_mime(mime)
    )
}

fn extension_for_image_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        _ => "jpg",
    }
}

pub fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}
