use std::sync::Arc;
use std::time::Instant;

use tokio::task::{spawn_blocking, JoinError};

use crate::models::{ClampMode, ExtractionResult, Stage, StageOutcome, UploadedImage};
use crate::processing::{
    BarcodeDecoder, BarcodeProcessor, DetectionParams, FaceDetector, FaceProcessor, ImageStore,
    OcrEngine, OcrProcessor,
};
use crate::utils::IdCardError;

/// Per-deployment knobs for the extraction stages.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub language: String,
    pub detection: DetectionParams,
    pub clamp_mode: ClampMode,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        ProcessorSettings {
            language: "eng".to_string(),
            detection: DetectionParams::default(),
            clamp_mode: ClampMode::Legacy,
        }
    }
}

/// Runs the name, barcode and face stages against one uploaded card image.
#[derive(Clone)]
pub struct IdCardProcessor {
    ocr: Arc<dyn OcrEngine>,
    barcode: Arc<dyn BarcodeDecoder>,
    face: Arc<dyn FaceDetector>,
    settings: ProcessorSettings,
}

impl IdCardProcessor {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        barcode: Arc<dyn BarcodeDecoder>,
        face: Arc<dyn FaceDetector>,
        settings: ProcessorSettings,
    ) -> Self {
        IdCardProcessor {
            ocr,
            barcode,
            face,
            settings,
        }
    }

    // Main entry point: store once, fan out the stages, join, release.
    pub async fn process(&self, upload: UploadedImage) -> Result<ExtractionResult, IdCardError> {
        if upload.is_empty() {
            return Err(IdCardError::MissingUpload);
        }

        let started = Instant::now();
        log::info!(
            "Processing ID card ({} bytes, {})",
            upload.len(),
            upload.content_type.as_deref().unwrap_or("unknown type")
        );

        // Step 1: Persist the upload. This is the only fatal step.
        let stored = spawn_blocking(move || ImageStore::store(&upload.bytes))
            .await
            .map_err(|e| IdCardError::TaskError(e.to_string()))??;
        let stored = Arc::new(stored);

        // Step 2: Run the independent stages on the blocking pool
        let name_task = {
            let ocr = Arc::clone(&self.ocr);
            let image = Arc::clone(&stored);
            let language = self.settings.language.clone();
            spawn_blocking(move || OcrProcessor::extract_name(ocr.as_ref(), image.path(), &language))
        };

        let barcode_task = {
            let decoder = Arc::clone(&self.barcode);
            let image = Arc::clone(&stored);
            spawn_blocking(move || BarcodeProcessor::extract_barcode(decoder.as_ref(), image.path()))
        };

        let face_task = {
            let detector = Arc::clone(&self.face);
            let image = Arc::clone(&stored);
            let params = self.settings.detection;
            let clamp = self.settings.clamp_mode;
            spawn_blocking(move || FaceProcessor::extract_face(detector.as_ref(), image.path(), &params, clamp))
        };

        // Step 3: Wait for all three before assembling anything
        let (name, barcode, face) = tokio::join!(name_task, barcode_task, face_task);

        let result = ExtractionResult::from_outcomes(
            Self::settle(Stage::Name, name),
            Self::settle(Stage::Barcode, barcode),
            Self::settle(Stage::Face, face),
        );

        // Step 4: Release storage. Every stage task has finished, so this is the last handle.
        match Arc::try_unwrap(stored) {
            Ok(stored) => {
                if let Err(e) = ImageStore::release(stored) {
                    log::warn!("{}", e);
                }
            }
            Err(_) => log::warn!("Stored image still shared after stages finished"),
        }

        log::info!("ID card processed in {}ms", started.elapsed().as_millis());
        Ok(result)
    }

    // A panicked stage counts as that stage failing.
    fn settle(stage: Stage, joined: Result<StageOutcome<String>, JoinError>) -> StageOutcome<String> {
        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{} stage aborted: {}", stage, e);
                StageOutcome::Failed(e.to_string())
            }
        }
    }
}
