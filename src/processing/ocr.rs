// OCR backends and the name heuristic applied to their output.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::StageOutcome;
use crate::utils::IdCardError;

/// Text recognition over an image file.
pub trait OcrEngine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Run recognition and return the raw page text.
    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, IdCardError>;
}

/// Tesseract via the `tesseract` command-line binary.
pub struct TesseractCli {
    binary: PathBuf,
    tessdata: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new(tessdata: Option<PathBuf>) -> Self {
        TesseractCli {
            binary: PathBuf::from("tesseract"),
            tessdata,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new(None)
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract-cli"
    }

    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, IdCardError> {
        let mut command = Command::new(&self.binary);
        command.arg(image_path).arg("stdout").args(["-l", language]);
        if let Some(dir) = &self.tessdata {
            command.arg("--tessdata-dir").arg(dir);
        }

        match command.output() {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(IdCardError::OcrError(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(IdCardError::OcrBackendUnavailable(format!(
                    "{:?} not found (install tesseract-ocr)",
                    self.binary
                )))
            }
            Err(e) => Err(IdCardError::OcrError(format!("Failed to run tesseract: {}", e))),
        }
    }
}

/// Tesseract linked through libtesseract.
#[cfg(feature = "tesseract")]
pub struct TesseractLibrary {
    tessdata: Option<String>,
}

#[cfg(feature = "tesseract")]
impl TesseractLibrary {
    pub fn new(tessdata: Option<PathBuf>) -> Self {
        TesseractLibrary {
            tessdata: tessdata.map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractLibrary {
    fn name(&self) -> &'static str {
        "tesseract-lib"
    }

    fn recognize(&self, image_path: &Path, language: &str) -> Result<String, IdCardError> {
        let path_str = image_path
            .to_str()
            .ok_or_else(|| IdCardError::OcrError("Could not convert path to string".to_string()))?;

        let mut tess = tesseract::Tesseract::new(self.tessdata.as_deref(), Some(language))
            .map_err(|e| IdCardError::OcrError(format!("Failed to initialize Tesseract: {}", e)))?
            .set_image(path_str)
            .map_err(|e| IdCardError::OcrError(format!("Failed to set image: {}", e)))?;

        tess.get_text()
            .map_err(|e| IdCardError::OcrError(format!("Failed to extract text: {}", e)))
    }
}

/// Split OCR output into non-empty lines. CR and LF both break lines.
pub fn text_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r']).filter(|line| !line.is_empty()).collect()
}

/// The card layout puts the first name on the third line and the last name on the fourth.
pub fn name_from_text(text: &str) -> Option<String> {
    let lines = text_lines(text);
    if lines.len() >= 4 {
        let first_name = lines[2].trim();
        let last_name = lines[3].trim();
        return Some(format!("{} {}", first_name, last_name));
    }
    None
}

pub struct OcrProcessor;

impl OcrProcessor {
    /// Run OCR on the stored image and pick out the holder name.
    pub fn extract_name(engine: &dyn OcrEngine, image_path: &Path, language: &str) -> StageOutcome<String> {
        let text = match engine.recognize(image_path, language) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("OCR failed ({}): {}", engine.name(), e);
                return StageOutcome::Failed(e.to_string());
            }
        };

        log::debug!("OCR ({}) returned {} lines", engine.name(), text_lines(&text).len());

        match name_from_text(&text) {
            Some(name) => StageOutcome::Found(name),
            None => StageOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedText(&'static str);

    impl OcrEngine for FixedText {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recognize(&self, _image_path: &Path, _language: &str) -> Result<String, IdCardError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    impl OcrEngine for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn recognize(&self, _image_path: &Path, _language: &str) -> Result<String, IdCardError> {
            Err(IdCardError::OcrError("engine unavailable".to_string()))
        }
    }

    #[test]
    fn test_text_lines_split_on_cr_and_lf() {
        let lines = text_lines("ID CARD\r\nRepublic X\n\nJOHN\rSMITH\n");
        assert_eq!(lines, vec!["ID CARD", "Republic X", "JOHN", "SMITH"]);
    }

    #[test]
    fn test_name_from_card_layout() {
        let text = "ID CARD\nRepublic X\nJOHN\nSMITH\nDOB 01/01/1990";
        assert_eq!(name_from_text(text), Some("JOHN SMITH".to_string()));
    }

    #[test]
    fn test_name_lines_are_trimmed() {
        let text = "A\nB\n   MARY ANN  \n\tDOE \n";
        assert_eq!(name_from_text(text), Some("MARY ANN DOE".to_string()));
    }

    #[test]
    fn test_fewer_than_four_lines() {
        assert_eq!(name_from_text("ID CARD\n\n\nRepublic X\nJOHN"), None);
        assert_eq!(name_from_text(""), None);
    }

    #[test]
    fn test_whitespace_only_lines_still_count() {
        // Only empty lines are discarded; a line of spaces keeps its slot.
        let text = "ID\n  \nJOHN\nSMITH";
        assert_eq!(name_from_text(text), Some("JOHN SMITH".to_string()));
    }

    #[test]
    fn test_extract_name_outcomes() {
        let path = Path::new("unused.png");
        assert_eq!(
            OcrProcessor::extract_name(&FixedText("a\nb\nJANE\nROE"), path, "eng"),
            StageOutcome::Found("JANE ROE".to_string())
        );
        assert_eq!(
            OcrProcessor::extract_name(&FixedText("a\nb"), path, "eng"),
            StageOutcome::NotFound
        );
        assert!(matches!(
            OcrProcessor::extract_name(&Broken, path, "eng"),
            StageOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_cli_missing_binary_is_unavailable() {
        let engine = TesseractCli::default().with_binary("/nonexistent/tesseract-binary");
        let result = engine.recognize(Path::new("card.png"), "eng");
        assert!(matches!(result, Err(IdCardError::OcrBackendUnavailable(_))));
    }
}
