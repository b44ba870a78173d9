//! Media type detection for stored blobs.
//!
//! Order of precedence: magic numbers in the content, then the caller's
//! declared type, then the filename extension, then a plain-text heuristic.
//! Anything left over is `application/octet-stream`.

use hoard_core::constants::DEFAULT_CONTENT_TYPE;

/// Detect the media type of `data`.
pub fn detect_content_type(data: &[u8], filename: &str, declared: Option<&str>) -> String {
    let extension = extension_of(filename);

    if let Some(sniffed) = sniff(data) {
        // Office documents are zip containers; the extension is more specific.
        if sniffed == "application/zip" {
            if let Some(ct) = extension.as_deref().and_then(content_type_for_extension) {
                if ct.starts_with("application/vnd.openxmlformats") {
                    return ct.to_string();
                }
            }
        }
        return sniffed.to_string();
    }

    if let Some(declared) = declared.map(normalize).filter(|d| is_specific(d)) {
        return declared;
    }

    if let Some(ct) = extension.as_deref().and_then(content_type_for_extension) {
        return ct.to_string();
    }

    if looks_like_text(data) {
        return "text/plain".to_string();
    }

    DEFAULT_CONTENT_TYPE.to_string()
}

/// Strip parameters (`; charset=...`) and lowercase.
pub fn normalize(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn is_specific(content_type: &str) -> bool {
    !content_type.is_empty() && content_type != DEFAULT_CONTENT_TYPE && content_type.contains('/')
}

fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Detect media type from magic numbers
fn sniff(data: &[u8]) -> Option<&'static str> {
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    // RIFF containers: WebP, WAV, AVI
    if data.len() >= 12 && &data[0..4] == b"RIFF" {
        match &data[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wav"),
            b"AVI " => return Some("video/x-msvideo"),
            _ => {}
        }
    }

    if data.starts_with(b"BM") && data.len() >= 14 {
        return Some("image/bmp");
    }

    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return Some("image/tiff");
    }

    if data.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }

    // ISO base media: ....ftyp
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return Some(match &data[8..12] {
            b"avif" | b"avis" => "image/avif",
            b"heic" | b"heix" | b"mif1" => "image/heic",
            b"qt  " => "video/quicktime",
            b"M4A " => "audio/mp4",
            _ => "video/mp4",
        });
    }

    // EBML header (Matroska / WebM)
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }

    if data.starts_with(b"ID3") || data.starts_with(&[0xFF, 0xFB]) {
        return Some("audio/mpeg");
    }

    if data.starts_with(b"OggS") {
        return Some("audio/ogg");
    }

    if data.starts_with(b"fLaC") {
        return Some("audio/flac");
    }

    if data.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Some("application/zip");
    }

    if data.starts_with(&[0x1F, 0x8B]) {
        return Some("application/gzip");
    }

    None
}

fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let ct = match extension {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => return None,
    };
    Some(ct)
}

fn looks_like_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let sample = &data[..data.len().min(1024)];
    !sample.contains(&0) && std::str::from_utf8(sample).is_ok()
}
