pub mod image;
pub mod pdf;

pub use pdf::{stitch_pages, PdfRasterizer, PdfiumRasterizer};
