//! Fixed user-facing texts.

pub const WELCOME: &str = "📸 Send me images (as photos/documents), then use /generate to create PDF. \
Use /cancel to clear images.\nMax file size: 5MB per image";

pub const HELP: &str = "How to use:\n\
1. Send images (as photos or documents)\n\
2. Use /generate to create PDF\n\
3. Use /cancel to start over\n\n\
⚠️ Max 5MB per image";

pub const SEND_AN_IMAGE: &str = "Please send an image (photo or document).";
pub const PROCESSING_FAILED: &str = "⚠️ Failed to process image";
pub const FIRST_IMAGE: &str = "✅ First image received! Send more or /generate";

pub const NOTHING_TO_GENERATE: &str = "No images received yet. Send some images first.";
pub const GENERATION_FAILED: &str = "Failed to create PDF. Please try again.";
pub const DELIVERY_FAILED: &str =
    "⚠️ Couldn't send the PDF. Your images are kept, use /generate to try again.";

pub const CLEARED: &str = "🗑 All images cleared!";
pub const NOTHING_TO_CLEAR: &str = "No images to clear.";
pub const EXPIRED: &str = "⌛ Your images expired and were cleared. Send them again to start over.";

pub const INTERNAL_FAILURE: &str = "⚠️ Something went wrong. Please try again.";

const MIB: u64 = 1024 * 1024;

#[must_use]
pub fn image_count(count: usize) -> String {
    format!("📚 Total images: {count}\nSend more or /generate")
}

#[must_use]
pub fn too_large(limit_bytes: u64) -> String {
    if limit_bytes >= MIB && limit_bytes % MIB == 0 {
        format!("❌ Image exceeds {}MB limit!", limit_bytes / MIB)
    } else {
        format!("❌ Image exceeds {limit_bytes} byte limit!")
    }
}
