//! PDF pages to a single tall image.
//!
//! Rendering goes through Google PDFium. A fresh `Pdfium` handle is bound per
//! call because the upstream type is `!Send`; the OS caches the dynamic library
//! so repeat binds are cheap.

use image::{imageops, DynamicImage, Rgb, RgbImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::config::PdfConfig;
use crate::error::{AppError, Result};

/// Upper bound on either side of a rendered page.
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

/// Renders every page of a PDF document, in page order.
///
/// Implementations are blocking and are called from `spawn_blocking`.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>>;
}

pub struct PdfiumRasterizer {
    dpi: u32,
    library_path: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            dpi: config.render_dpi.max(1),
            library_path: config.library_path.clone(),
        }
    }

    /// Binds PDFium from the configured path, falling back to the system search path.
    fn load_pdfium(&self) -> Result<Pdfium> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path).map_err(|e| {
                AppError::Processing(format!("Failed to load PDFium from {path}: {e}"))
            })?,
            None => Pdfium::bind_to_system_library()
                .map_err(|e| AppError::Processing(format!("PDFium library not found: {e}")))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>> {
        let pdfium = self.load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| AppError::Processing(format!("Failed to load PDF: {e}")))?;

        let mut images = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let (target_w, target_h) =
                compute_render_dimensions(page.width().value, page.height().value, self.dpi);

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page.render_with_config(&config).map_err(|e| {
                AppError::Processing(format!("Rendering page {index} failed: {e}"))
            })?;

            let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
            let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(
                || AppError::Processing(format!("Page {index} bitmap has unexpected size")),
            )?;

            debug!(page = index, width, height, "Rendered PDF page");
            images.push(DynamicImage::ImageRgba8(rgba));
        }

        Ok(images)
    }
}

/// Pixel size for a page at `dpi`, with the longer side capped at
/// [`MAX_DIMENSION_PX`] and the aspect ratio preserved.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        warn!(
            raw_width = raw_w as u32,
            raw_height = raw_h as u32,
            "Page dimensions capped to {MAX_DIMENSION_PX}px"
        );
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

/// Stacks pages top to bottom on a white canvas.
///
/// The canvas is as wide as the widest page and as tall as all pages
/// together. Page `i` sits at `x = 0`, `y = h0 + .. + h(i-1)`.
pub fn stitch_pages(pages: &[DynamicImage]) -> Result<RgbImage> {
    if pages.is_empty() {
        return Err(AppError::Processing("PDF has no pages".to_string()));
    }

    let width = pages.iter().map(|p| p.width()).max().unwrap_or(0);
    let height = pages
        .iter()
        .try_fold(0u32, |acc, p| acc.checked_add(p.height()))
        .ok_or_else(|| AppError::Processing("Stitched image too tall".to_string()))?;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut y_offset = 0i64;
    for page in pages {
        imageops::replace(&mut canvas, &page.to_rgb8(), 0, y_offset);
        y_offset += i64::from(page.height());
    }

    Ok(canvas)
}
