pub mod detection;
pub mod pdf;
pub mod types;

pub use pdf::{ImagePdfRenderer, PdfRenderer};
pub use types::{ImageFormat, MediaType};
pub use detection::{classify_attachment, staged_image_name};
