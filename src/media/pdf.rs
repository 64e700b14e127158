//! Image → PDF conversion.
//!
//! One page per image, in input order. JPEG streams are embedded untouched
//! (`/DCTDecode`); every other format is decoded and stored as
//! Flate-compressed raw samples, so no image is re-encoded lossily.

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageDecoder};

use crate::error::RenderError;

/// Pure conversion from an ordered list of encoded images to PDF bytes.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, images: &[Vec<u8>]) -> Result<Vec<u8>, RenderError>;
}

const DEFAULT_DPI: f64 = 96.0;

pub struct ImagePdfRenderer {
    dpi: f64,
}

impl ImagePdfRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self { dpi: DEFAULT_DPI }
    }

    /// Pixels per inch used to size pages. Non-positive values fall back to 96.
    #[must_use]
    pub fn with_dpi(dpi: f64) -> Self {
        let dpi = if dpi.is_finite() && dpi > 0.0 {
            dpi
        } else {
            DEFAULT_DPI
        };
        Self { dpi }
    }
}

impl Default for ImagePdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRenderer for ImagePdfRenderer {
    fn render(&self, images: &[Vec<u8>]) -> Result<Vec<u8>, RenderError> {
        if images.is_empty() {
            return Err(RenderError::Empty);
        }

        let pages = images
            .iter()
            .enumerate()
            .map(|(index, bytes)| PageImage::prepare(index, bytes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(write_document(&pages, self.dpi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            Self::Gray => "/DeviceGray",
            Self::Rgb => "/DeviceRGB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamFilter {
    Dct,
    Flate,
}

impl StreamFilter {
    fn pdf_name(self) -> &'static str {
        match self {
            Self::Dct => "/DCTDecode",
            Self::Flate => "/FlateDecode",
        }
    }
}

struct PageImage {
    width: u32,
    height: u32,
    color: ColorSpace,
    filter: StreamFilter,
    data: Vec<u8>,
}

impl PageImage {
    fn prepare(index: usize, bytes: &[u8]) -> Result<Self, RenderError> {
        let page = match jpeg_passthrough(bytes) {
            Some(page) => page,
            None => Self::decode(index, bytes)?,
        };
        if page.width == 0 || page.height == 0 {
            return Err(RenderError::EmptyImage { index });
        }
        Ok(page)
    }

    fn decode(index: usize, bytes: &[u8]) -> Result<Self, RenderError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| RenderError::Decode {
            index,
            message: e.to_string(),
        })?;

        let (color, samples) = match &decoded {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLumaA16(_) => (ColorSpace::Gray, decoded.to_luma8().into_raw()),
            _ => (ColorSpace::Rgb, decoded.to_rgb8().into_raw()),
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&samples)
            .map_err(|source| RenderError::Compress { index, source })?;
        let data = encoder
            .finish()
            .map_err(|source| RenderError::Compress { index, source })?;

        let (width, height) = decoded.dimensions();
        Ok(Self {
            width,
            height,
            color,
            filter: StreamFilter::Flate,
            data,
        })
    }
}

/// Baseline/progressive JPEGs with one or three components go into the PDF
/// as-is. Anything else (CMYK, broken headers) takes the decode path.
fn jpeg_passthrough(bytes: &[u8]) -> Option<PageImage> {
    if !infer::image::is_jpeg(bytes) {
        return None;
    }
    let components = jpeg_components(bytes)?;
    let decoder = JpegDecoder::new(Cursor::new(bytes)).ok()?;
    let (width, height) = decoder.dimensions();
    let color = match (decoder.color_type(), components) {
        (ColorType::L8, 1) => ColorSpace::Gray,
        (ColorType::Rgb8, 3) => ColorSpace::Rgb,
        _ => return None,
    };
    Some(PageImage {
        width,
        height,
        color,
        filter: StreamFilter::Dct,
        data: bytes.to_vec(),
    })
}

/// Component count from the first SOF marker.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // FF Cx | len(2) | precision(1) | height(2) | width(2) | components(1)
            return bytes.get(pos + 9).copied();
        }
        pos += 2 + len;
    }
    None
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new(object_count: usize) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: vec![0; object_count + 1],
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets[id] = self.buf.len();
        self.buf
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn stream_object(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets[id] = self.buf.len();
        self.buf.extend_from_slice(
            format!("{id} 0 obj\n<< {dict} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len();
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets[1..] {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root {root} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;

fn write_document(pages: &[PageImage], dpi: f64) -> Vec<u8> {
    // Each page owns three objects: page, content stream, image XObject.
    let page_id = |i: usize| 3 + i * 3;
    let mut pdf = PdfWriter::new(2 + pages.len() * 3);

    pdf.object(
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");
    pdf.object(
        PAGES_ID,
        &format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            pages.len()
        ),
    );

    for (i, page) in pages.iter().enumerate() {
        let (id, content_id, image_id) = (page_id(i), page_id(i) + 1, page_id(i) + 2);
        let width = points(page.width, dpi);
        let height = points(page.height, dpi);

        pdf.object(
            id,
            &format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {width} {height}] \
                 /Resources << /XObject << /Im0 {image_id} 0 R >> >> /Contents {content_id} 0 R >>"
            ),
        );

        let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/Im0 Do\nQ");
        pdf.stream_object(content_id, "", content.as_bytes());

        pdf.stream_object(
            image_id,
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                 /BitsPerComponent 8 /Filter {}",
                page.width,
                page.height,
                page.color.pdf_name(),
                page.filter.pdf_name()
            ),
            &page.data,
        );
    }

    pdf.finish(CATALOG_ID)
}

/// Pixel length → PDF points, trimmed to at most four decimals.
fn points(pixels: u32, dpi: f64) -> String {
    let value = f64::from(pixels) * 72.0 / dpi;
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
