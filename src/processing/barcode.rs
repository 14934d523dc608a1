// Barcode stage: symbology-agnostic decoding over the full frame.

use std::path::Path;

use image::GrayImage;

use crate::models::StageOutcome;
use crate::processing::ImageProcessor;
use crate::utils::IdCardError;

/// Barcode decoding over an 8-bit luma bitmap.
pub trait BarcodeDecoder: Send + Sync {
    /// `Ok(None)` means the frame was scanned and held no readable symbol.
    fn decode(&self, bitmap: &GrayImage) -> Result<Option<String>, IdCardError>;
}

/// Multi-format decoder backed by rxing. The format is auto-detected.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl BarcodeDecoder for RxingDecoder {
    fn decode(&self, bitmap: &GrayImage) -> Result<Option<String>, IdCardError> {
        let (width, height) = bitmap.dimensions();
        match rxing::helpers::detect_in_luma(bitmap.as_raw().clone(), width, height, None) {
            Ok(result) => {
                log::debug!("Decoded {:?} barcode", result.getBarcodeFormat());
                Ok(Some(result.getText().to_string()))
            }
            Err(rxing::Exceptions::NotFoundException(_)) => Ok(None),
            Err(e) => Err(IdCardError::BarcodeError(e.to_string())),
        }
    }
}

pub struct BarcodeProcessor;

impl BarcodeProcessor {
    /// Decode the first barcode found in the stored image.
    pub fn extract_barcode(decoder: &dyn BarcodeDecoder, image_path: &Path) -> StageOutcome<String> {
        let outcome: StageOutcome<String> = ImageProcessor::load_gray(image_path)
            .and_then(|bitmap| decoder.decode(&bitmap))
            .into();

        if let StageOutcome::Failed(reason) = &outcome {
            log::warn!("Barcode extraction failed: {}", reason);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};
    use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
    use std::io::Write;

    fn write_png(img: &GrayImage) -> tempfile::NamedTempFile {
        let png = ImageProcessor::encode_png(&DynamicImage::ImageLuma8(img.clone())).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png).unwrap();
        file
    }

    fn qr_code(contents: &str) -> GrayImage {
        let matrix = MultiFormatWriter::default()
            .encode(contents, &BarcodeFormat::QR_CODE, 300, 300)
            .unwrap();
        GrayImage::from_fn(matrix.getWidth(), matrix.getHeight(), |x, y| {
            if matrix.get(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_decodes_qr_payload() {
        let file = write_png(&qr_code("IDC<123456789<<JOHN<SMITH"));
        let outcome = BarcodeProcessor::extract_barcode(&RxingDecoder, file.path());
        assert_eq!(
            outcome,
            StageOutcome::Found("IDC<123456789<<JOHN<SMITH".to_string())
        );
    }

    #[test]
    fn test_blank_frame_has_no_barcode() {
        let blank = GrayImage::from_pixel(200, 120, Luma([255]));
        let file = write_png(&blank);
        let outcome = BarcodeProcessor::extract_barcode(&RxingDecoder, file.path());
        assert_eq!(outcome.into_field(crate::models::Stage::Barcode), "Barcode not found");
    }

    #[test]
    fn test_unreadable_file_is_soft_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"GIF89a but not really").unwrap();
        let outcome = BarcodeProcessor::extract_barcode(&RxingDecoder, file.path());
        assert!(matches!(outcome, StageOutcome::Failed(_)));
        assert_eq!(outcome.into_field(crate::models::Stage::Barcode), "Barcode not found");
    }
}
