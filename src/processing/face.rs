// Face stage: detect, expand the first region, crop the color frame, return base64 PNG.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use imageproc::rect::Rect;

use crate::models::{ClampMode, FaceRegion, StageOutcome};
use crate::processing::ImageProcessor;
use crate::utils::IdCardError;

/// Padding added on every side of a detected face before cropping.
pub const FACE_MARGIN: i32 = 42;

/// Fixed detector tuning. Favors precision over recall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        DetectionParams {
            scale_factor: 1.1,
            min_neighbors: 10,
        }
    }
}

/// Frontal face detection over a grayscale frame.
pub trait FaceDetector: Send + Sync {
    /// Regions in the detector's own order. Callers must not re-sort them.
    fn detect(&self, gray: &GrayImage, params: &DetectionParams) -> Result<Vec<FaceRegion>, IdCardError>;
}

/// SeetaFace frontal detector (rustface). The model is read once, at construction.
pub struct RustfaceDetector {
    model_path: PathBuf,
    model: ModelState,
    min_face_size: u32,
}

enum ModelState {
    Loaded(rustface::Model),
    Missing,
    Invalid(String),
}

// rustface has no neighbor voting; overlapping windows are merged internally and the
// confidence score is the precision knob. Ten neighbors maps onto its stock 2.0 threshold.
const NEIGHBORS_PER_SCORE_UNIT: f64 = 5.0;

impl RustfaceDetector {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        let model_path = model_path.into();
        let model = Self::load(&model_path);
        if let ModelState::Invalid(reason) = &model {
            log::debug!("Face model at {:?} rejected: {}", model_path, reason);
        }
        RustfaceDetector {
            model_path,
            model,
            min_face_size: 20,
        }
    }

    fn load(model_path: &Path) -> ModelState {
        if !model_path.is_file() {
            return ModelState::Missing;
        }
        let Some(path_str) = model_path.to_str() else {
            return ModelState::Invalid("Model path is not valid UTF-8".to_string());
        };
        match rustface::load_model(path_str) {
            Ok(model) => ModelState::Loaded(model),
            Err(e) => ModelState::Invalid(e.to_string()),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn model_available(&self) -> bool {
        matches!(self.model, ModelState::Loaded(_))
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &GrayImage, params: &DetectionParams) -> Result<Vec<FaceRegion>, IdCardError> {
        let model = match &self.model {
            ModelState::Loaded(model) => model.clone(),
            ModelState::Missing => {
                return Err(IdCardError::ModelNotFound(self.model_path.display().to_string()))
            }
            ModelState::Invalid(reason) => {
                return Err(IdCardError::FaceDetectionError(format!(
                    "Failed to load detector model: {}",
                    reason
                )))
            }
        };

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(self.min_face_size);
        detector.set_pyramid_scale_factor((1.0 / params.scale_factor) as f32);
        detector.set_score_thresh(params.min_neighbors as f64 / NEIGHBORS_PER_SCORE_UNIT);
        detector.set_slide_window_step(4, 4);

        let (width, height) = gray.dimensions();
        let mut image = rustface::ImageData::new(gray.as_raw(), width, height);
        let faces = detector.detect(&mut image);

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
            })
            .collect())
    }
}

/// Grow a detected region by [`FACE_MARGIN`] on all sides.
///
/// `Legacy` reproduces the historical bound exactly: origin clamped at zero, size limited
/// by `image - origin + margin`. When the face sits within the margin of the left or top
/// edge the result can run past the right or bottom edge, and the crop then fails.
/// `Bounded` intersects the grown region with the image instead.
pub fn expand_region(face: &FaceRegion, image_width: u32, image_height: u32, mode: ClampMode) -> FaceRegion {
    match mode {
        ClampMode::Legacy => {
            let (img_w, img_h) = (image_width as i32, image_height as i32);
            FaceRegion::new(
                (face.x - FACE_MARGIN).max(0),
                (face.y - FACE_MARGIN).max(0),
                (face.width + 2 * FACE_MARGIN).min(img_w - face.x + FACE_MARGIN),
                (face.height + 2 * FACE_MARGIN).min(img_h - face.y + FACE_MARGIN),
            )
        }
        ClampMode::Bounded => {
            let bounds = Rect::at(0, 0).of_size(image_width.max(1), image_height.max(1));
            let grown = Rect::at(face.x - FACE_MARGIN, face.y - FACE_MARGIN).of_size(
                (face.width + 2 * FACE_MARGIN).max(1) as u32,
                (face.height + 2 * FACE_MARGIN).max(1) as u32,
            );
            match grown.intersect(bounds) {
                Some(r) => FaceRegion::new(r.left(), r.top(), r.width() as i32, r.height() as i32),
                None => FaceRegion::new(face.x.max(0), face.y.max(0), 0, 0),
            }
        }
    }
}

/// Crop without silent clamping: the region must lie entirely inside the image.
pub fn crop_region(img: &DynamicImage, region: &FaceRegion) -> Result<DynamicImage, IdCardError> {
    let (img_w, img_h) = (img.width() as i64, img.height() as i64);
    let (x, y, w, h) = (
        region.x as i64,
        region.y as i64,
        region.width as i64,
        region.height as i64,
    );

    if x < 0 || y < 0 || w <= 0 || h <= 0 || x + w > img_w || y + h > img_h {
        return Err(IdCardError::InvalidCropRegion {
            x: x.max(0) as u32,
            y: y.max(0) as u32,
            width: w.max(0) as u32,
            height: h.max(0) as u32,
            image_width: img_w as u32,
            image_height: img_h as u32,
        });
    }

    Ok(img.crop_imm(x as u32, y as u32, w as u32, h as u32))
}

pub struct FaceProcessor;

impl FaceProcessor {
    /// Detect the holder's face and return the expanded crop as base64 PNG.
    pub fn extract_face(
        detector: &dyn FaceDetector,
        image_path: &Path,
        params: &DetectionParams,
        clamp: ClampMode,
    ) -> StageOutcome<String> {
        match Self::try_extract_face(detector, image_path, params, clamp) {
            Ok(Some(encoded)) => StageOutcome::Found(encoded),
            Ok(None) => StageOutcome::NotFound,
            Err(e) => {
                log::warn!("Face extraction failed: {}", e);
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_extract_face(
        detector: &dyn FaceDetector,
        image_path: &Path,
        params: &DetectionParams,
        clamp: ClampMode,
    ) -> Result<Option<String>, IdCardError> {
        let image = ImageProcessor::load_color(image_path)?;
        let gray = ImageProcessor::to_grayscale(&image);

        let faces = detector.detect(&gray, params)?;
        let Some(face) = faces.first() else {
            return Ok(None);
        };
        log::debug!("Detected {} face(s), using {:?}", faces.len(), face);

        let region = expand_region(face, image.width(), image.height(), clamp);
        let portrait = crop_region(&image, &region)?;
        let png = ImageProcessor::encode_png(&portrait)?;

        Ok(Some(ImageProcessor::encode_base64(&png)))
    }
}
