use serde::Serialize;
use std::fmt;

use crate::utils::IdCardError;

pub const NAME_NOT_FOUND: &str = "Name not found";
pub const BARCODE_NOT_FOUND: &str = "Barcode not found";
pub const NO_FACE_DETECTED: &str = "No face detected";
pub const FACE_DETECTION_FAILED: &str = "Face detection failed";

/// Raw upload as received at the request boundary.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedImage {
    /// Wrap uploaded bytes. An empty upload is rejected before any stage runs.
    pub fn new(
        bytes: Vec<u8>,
        content_type: Option<String>,
        file_name: Option<String>,
    ) -> Result<Self, IdCardError> {
        if bytes.is_empty() {
            return Err(IdCardError::MissingUpload);
        }
        Ok(UploadedImage {
            bytes,
            content_type,
            file_name,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bounding box in source-image pixel coordinates, as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        FaceRegion {
            x,
            y,
            width,
            height,
        }
    }
}

/// How the expanded face region is bounded on the right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClampMode {
    /// Width/height limited by `image - origin + margin`, top/left clamped at zero.
    /// Regions near the left or top edge can overrun the image and fail to crop.
    #[default]
    Legacy,
    /// Region intersected with the image bounds.
    Bounded,
}

/// The three extraction stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Name,
    Barcode,
    Face,
}

impl Stage {
    pub fn not_found_sentinel(&self) -> &'static str {
        match self {
            Stage::Name => NAME_NOT_FOUND,
            Stage::Barcode => BARCODE_NOT_FOUND,
            Stage::Face => NO_FACE_DETECTED,
        }
    }

    pub fn failed_sentinel(&self) -> &'static str {
        match self {
            Stage::Name => NAME_NOT_FOUND,
            Stage::Barcode => BARCODE_NOT_FOUND,
            Stage::Face => FACE_DETECTION_FAILED,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Name => write!(f, "name"),
            Stage::Barcode => write!(f, "barcode"),
            Stage::Face => write!(f, "face"),
        }
    }
}

/// Outcome of one stage. Soft failures never leave the stage as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Found(T),
    NotFound,
    Failed(String),
}

impl<T> StageOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, StageOutcome::Found(_))
    }
}

impl<T> From<Result<Option<T>, IdCardError>> for StageOutcome<T> {
    fn from(result: Result<Option<T>, IdCardError>) -> Self {
        match result {
            Ok(Some(value)) => StageOutcome::Found(value),
            Ok(None) => StageOutcome::NotFound,
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    }
}

impl StageOutcome<String> {
    /// Map the outcome onto the response field, substituting the stage's sentinel.
    pub fn into_field(self, stage: Stage) -> String {
        match self {
            StageOutcome::Found(value) => value,
            StageOutcome::NotFound => stage.not_found_sentinel().to_string(),
            StageOutcome::Failed(_) => stage.failed_sentinel().to_string(),
        }
    }
}

/// Combined response record. All three fields are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractionResult {
    pub name: String,
    pub barcode: String,
    pub image_base64: String,
}

impl ExtractionResult {
    pub fn from_outcomes(
        name: StageOutcome<String>,
        barcode: StageOutcome<String>,
        face: StageOutcome<String>,
    ) -> Self {
        ExtractionResult {
            name: name.into_field(Stage::Name),
            barcode: barcode.into_field(Stage::Barcode),
            image_base64: face.into_field(Stage::Face),
        }
    }
}
