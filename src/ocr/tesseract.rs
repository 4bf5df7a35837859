//! Tesseract OCR backend implementation.
//!
//! Runs the Tesseract CLI over a temporary PNG, constrained to the CAPTCHA
//! character set and a single-word segmentation mode.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use image::GrayImage;
use tempfile::NamedTempFile;
use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
use super::tools::resolve_binary;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn executable(&self) -> Option<PathBuf> {
        resolve_binary(self.config.binary_path.as_ref(), "tesseract")
    }

    /// Arguments after the input path.
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "stdout".to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            "--psm".to_string(),
            self.config.page_seg_mode.to_string(),
        ];
        if !self.config.whitelist.is_empty() {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", self.config.whitelist));
        }
        args
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let exe = self.executable().ok_or_else(|| {
            OcrError::BackendNotAvailable("tesseract not found (install tesseract-ocr)".to_string())
        })?;

        let output = Command::new(exe).arg(image_path).args(self.args()).output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        self.executable().is_some()
    }

    fn availability_hint(&self) -> String {
        match (&self.config.binary_path, self.executable()) {
            (_, Some(path)) => format!("Tesseract is available at {}", path.display()),
            (Some(path), None) => format!("Configured tesseract path does not exist: {}", path.display()),
            (None, None) => "Tesseract not installed. Install with: apt install tesseract-ocr".to_string(),
        }
    }

    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();

        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .map_err(|e| OcrError::ImageError(e.to_string()))?;

        let text = self.run_tesseract(temp_input.path())?;
        let elapsed = start.elapsed();
        debug!("tesseract read {:?} in {}ms", text.trim(), elapsed.as_millis());

        Ok(OcrResult {
            text,
            confidence: None,
            backend: OcrBackendType::Tesseract,
            processing_time_ms: elapsed.as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_constrain_charset_and_mode() {
        let backend = TesseractBackend::new();
        let args = backend.args();
        assert_eq!(args[0], "stdout");
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "8"));
        assert!(args
            .iter()
            .any(|a| a == "tessedit_char_whitelist=abcdefghijklmnopqrstuvwxyz0123456789"));
    }

    #[test]
    fn test_empty_whitelist_omits_config_flag() {
        let backend = TesseractBackend::with_config(OcrConfig {
            whitelist: String::new(),
            page_seg_mode: 7,
            ..Default::default()
        });
        let args = backend.args();
        assert!(!args.iter().any(|a| a == "-c"));
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "7"));
    }

    #[test]
    fn test_missing_binary_reports_unavailable() {
        let backend = TesseractBackend::with_config(OcrConfig {
            binary_path: Some(PathBuf::from("/nonexistent/tesseract")),
            ..Default::default()
        });
        assert!(!backend.is_available());
        let err = backend.recognize(&GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, OcrError::BackendNotAvailable(_)));
    }
}
