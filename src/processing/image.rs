use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GrayImage, ImageFormat};

use crate::utils::IdCardError;

/// ImageProcessor holds the load/convert/encode helpers shared by the extraction stages.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Load an image from disk in color, guessing the format from its content.
    pub fn load_color(image_path: &Path) -> Result<DynamicImage, IdCardError> {
        let reader = image::ImageReader::open(image_path)
            .map_err(|e| IdCardError::ImageProcessingError(format!("Failed to open image: {}", e)))?
            .with_guessed_format()
            .map_err(|e| IdCardError::ImageProcessingError(format!("Failed to read image: {}", e)))?;

        let img = reader
            .decode()
            .map_err(|e| IdCardError::ImageProcessingError(format!("Failed to decode image: {}", e)))?;

        Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
    }

    /// Load an image from disk as 8-bit luma.
    pub fn load_gray(image_path: &Path) -> Result<GrayImage, IdCardError> {
        Ok(Self::to_grayscale(&Self::load_color(image_path)?))
    }

    pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
        img.to_luma8()
    }

    /// Encode as PNG into memory.
    pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, IdCardError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| IdCardError::EncodingError(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }

    pub fn encode_base64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }
}

/// Decode a base64 image string back into an image.
///
/// A data-URI prefix such as `data:image/png;base64,` is accepted; everything up to
/// the first comma is dropped.
pub fn decode_base64_image(encoded: &str) -> Result<DynamicImage, IdCardError> {
    let payload = match encoded.find(',') {
        Some(idx) => &encoded[idx + 1..],
        None => encoded,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| IdCardError::EncodingError(format!("Invalid base64: {}", e)))?;

    image::load_from_memory(&bytes)
        .map_err(|e| IdCardError::ImageProcessingError(format!("Failed to decode image: {}", e)))
}
