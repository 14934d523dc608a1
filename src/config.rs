// Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::id_card_processor::{IdCardProcessor, ProcessorSettings};
use crate::models::ClampMode;
use crate::processing::{DetectionParams, OcrEngine, RustfaceDetector, RxingDecoder, TesseractCli};
use crate::utils::IdCardError;

pub const DEFAULT_FACE_MODEL: &str = "Resources/seeta_fd_frontal_v1.0.bin";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "idcard", version, about = "Extract name, barcode and face photo from ID card images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long, env = "IDCARD_BIND", default_value = "0.0.0.0:7071")]
        bind: SocketAddr,

        #[arg(long, env = "IDCARD_MAX_UPLOAD", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,
    },
    /// Run the pipeline on a local image and print the result as JSON
    Extract {
        path: PathBuf,

        /// Also write the cropped face to this PNG file
        #[arg(long)]
        save_face: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OcrBackend {
    /// `tesseract` binary on PATH
    Cli,
    /// Linked libtesseract (requires the `tesseract` feature)
    Library,
}

#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Face detector model file
    #[arg(long, env = "IDCARD_FACE_MODEL", default_value = DEFAULT_FACE_MODEL, global = true)]
    pub face_model: PathBuf,

    /// Tesseract language data directory
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata: Option<PathBuf>,

    /// OCR language
    #[arg(long, env = "IDCARD_OCR_LANG", default_value = "eng", global = true)]
    pub lang: String,

    #[arg(long, env = "IDCARD_OCR_BACKEND", value_enum, default_value_t = OcrBackend::Cli, global = true)]
    pub ocr_backend: OcrBackend,

    /// Bounding rule for the expanded face region
    #[arg(long, env = "IDCARD_CLAMP_MODE", value_enum, default_value_t = ClampMode::Legacy, global = true)]
    pub clamp_mode: ClampMode,
}

impl EngineArgs {
    pub fn settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            language: self.lang.clone(),
            detection: DetectionParams::default(),
            clamp_mode: self.clamp_mode,
        }
    }

    fn ocr_engine(&self) -> Result<Arc<dyn OcrEngine>, IdCardError> {
        match self.ocr_backend {
            OcrBackend::Cli => Ok(Arc::new(TesseractCli::new(self.tessdata.clone()))),
            #[cfg(feature = "tesseract")]
            OcrBackend::Library => Ok(Arc::new(crate::processing::TesseractLibrary::new(
                self.tessdata.clone(),
            ))),
            #[cfg(not(feature = "tesseract"))]
            OcrBackend::Library => Err(IdCardError::OcrBackendUnavailable(
                "built without the `tesseract` feature".to_string(),
            )),
        }
    }

    /// Wire the configured engines into a processor.
    ///
    /// A missing face model is only a warning here; the face stage reports it per request.
    pub fn build_processor(&self) -> Result<IdCardProcessor, IdCardError> {
        let ocr = self.ocr_engine()?;

        let detector = RustfaceDetector::new(self.face_model.clone());
        if !detector.model_available() {
            log::warn!(
                "Face detector model not found at {:?}; face extraction will report failure",
                detector.model_path()
            );
        }

        log::info!(
            "OCR backend: {} ({}), clamp mode: {:?}",
            ocr.name(),
            self.lang,
            self.clamp_mode
        );

        Ok(IdCardProcessor::new(
            ocr,
            Arc::new(RxingDecoder),
            Arc::new(detector),
            self.settings(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "idcard",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--clamp-mode",
            "bounded",
            "--face-model",
            "/models/face.bin",
        ])
        .unwrap();

        match cli.command {
            Command::Serve { bind, .. } => assert_eq!(bind.port(), 9000),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.engine.clamp_mode, ClampMode::Bounded);
        assert_eq!(cli.engine.face_model, PathBuf::from("/models/face.bin"));
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from(["idcard", "extract", "card.jpg", "--save-face", "face.png"]).unwrap();
        match cli.command {
            Command::Extract { path, save_face } => {
                assert_eq!(path, PathBuf::from("card.jpg"));
                assert_eq!(save_face, Some(PathBuf::from("face.png")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_settings_keep_fixed_detection_params() {
        let cli = Cli::try_parse_from(["idcard", "extract", "card.jpg", "--lang", "deu"]).unwrap();
        let settings = cli.engine.settings();
        assert_eq!(settings.language, "deu");
        assert_eq!(settings.detection, DetectionParams::default());
    }

    #[test]
    fn test_build_processor_with_missing_model() {
        let cli = Cli::try_parse_from([
            "idcard",
            "extract",
            "card.jpg",
            "--ocr-backend",
            "cli",
            "--face-model",
            "/nonexistent/model.bin",
        ])
        .unwrap();
        assert!(cli.engine.build_processor().is_ok());
    }
}
