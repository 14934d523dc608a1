pub mod barcode;
pub mod face;
pub mod image;
pub mod ocr;
pub mod storage;

pub use barcode::{BarcodeDecoder, BarcodeProcessor, RxingDecoder};
pub use face::{DetectionParams, FaceDetector, FaceProcessor, RustfaceDetector};
pub use self::image::{decode_base64_image, ImageProcessor};
pub use ocr::{OcrEngine, OcrProcessor, TesseractCli};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractLibrary;
pub use storage::{ImageStore, StoredImage};
