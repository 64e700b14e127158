use chrono::{DateTime, Utc};

use super::{ImageFormat, MediaType};
use crate::transport::AttachmentKind;

/// Classify an inbound attachment by what the transport declared. Photos are
/// always images; documents are judged by their declared MIME type only.
#[must_use]
pub fn classify_attachment(kind: &AttachmentKind) -> MediaType {
    match kind {
        AttachmentKind::Photo => MediaType::Image,
        AttachmentKind::Document { mime_type } => mime_type
            .as_deref()
            .map_or(MediaType::Other, MediaType::from_mime),
    }
}

#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<String> {
    infer::get(data).map(|info| info.mime_type().to_string())
}

/// File extension for a staged image. Unknown or non-image types fall back to `jpg`.
#[must_use]
pub fn image_extension(mime_type: Option<&str>) -> &'static str {
    mime_type
        .and_then(ImageFormat::from_mime)
        .unwrap_or(ImageFormat::Jpeg)
        .extension()
}

/// Name for a newly staged image: a microsecond timestamp plus an extension
/// sniffed from the bytes.
#[must_use]
pub fn staged_image_name(data: &[u8], now: DateTime<Utc>) -> String {
    let mime = detect_mime(data);
    format!(
        "{}.{}",
        now.format("%Y%m%d%H%M%S%6f"),
        image_extension(mime.as_deref())
    )
}
