//! Attachment filename and content-type helpers

use std::path::Path;

// Leaves room under NAME_MAX (255 bytes) for the extension and yt-dlp's
// `.part`/`.temp` suffixes.
const MAX_STEM_BYTES: usize = 200;
const FALLBACK_STEM: &str = "download";

/// Turn a video title into a file stem safe on common filesystems.
///
/// Path separators, reserved characters and control characters are replaced
/// with `_`; surrounding whitespace and dots are trimmed. The result is at most
/// `MAX_STEM_BYTES` bytes of UTF-8, cut on a character boundary.
pub fn sanitize_stem(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = truncate_to_bytes(&replaced, MAX_STEM_BYTES)
        .trim()
        .trim_matches('.')
        .trim();
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_to_bytes(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// ASCII-only variant used in headers that cannot carry UTF-8
pub fn sanitize_ascii_filename(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let compact = sanitized.trim();
    if compact.is_empty() {
        "download.bin".to_string()
    } else {
        compact.to_string()
    }
}

/// `Content-Disposition` value for an attachment.
///
/// Plain ASCII names are emitted as-is; others get an RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let plain = filename.is_ascii() && !filename.contains(['"', '\\']);
    if plain {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            sanitize_ascii_filename(filename),
            urlencoding::encode(filename)
        )
    }
}

pub fn content_type_for_filename(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
