use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdCardError {
    #[error("Please upload an image file.")]
    MissingUpload,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Image processing error: {0}")]
    ImageProcessingError(String),

    #[error("OCR error: {0}")]
    OcrError(String),

    #[error("OCR backend not available: {0}")]
    OcrBackendUnavailable(String),

    #[error("Barcode decoding error: {0}")]
    BarcodeError(String),

    #[error("Face detection error: {0}")]
    FaceDetectionError(String),

    #[error("Face detector model not found: {0}")]
    ModelNotFound(String),

    #[error("Crop region {x},{y} {width}x{height} exceeds image bounds {image_width}x{image_height}")]
    InvalidCropRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Stage task error: {0}")]
    TaskError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IdCardError {
    /// True for errors caused by the client's request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IdCardError::MissingUpload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_upload_message() {
        let err = IdCardError::MissingUpload;
        assert_eq!(err.to_string(), "Please upload an image file.");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_crop_region_message() {
        let err = IdCardError::InvalidCropRegion {
            x: 0,
            y: 10,
            width: 120,
            height: 50,
            image_width: 100,
            image_height: 100,
        };
        assert_eq!(
            err.to_string(),
            "Crop region 0,10 120x50 exceeds image bounds 100x100"
        );
        assert!(!err.is_client_error());
    }
}
