use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{AppError, Result};

/// Decode uploaded bytes into an image, guessing the format from its magic bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::Processing(format!("Failed to read image: {e}")))?;

    reader
        .decode()
        .map_err(|e| AppError::Processing(format!("Failed to decode image: {e}")))
}

/// Encode as baseline JPEG. Alpha is dropped first since JPEG has no alpha channel.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut output = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut output), ImageFormat::Jpeg)
        .map_err(|e| AppError::Processing(format!("Failed to encode image: {e}")))?;
    Ok(output)
}
