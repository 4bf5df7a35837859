//! CAPTCHA solving: preprocessing plus OCR behind one capability.

use thiserror::Error;
use tracing::debug;

use super::backend::{OcrBackend, OcrError, OcrResult};
use super::preprocess::{decode_grayscale, PreprocessError, Preprocessor};

/// Why a CAPTCHA image did not yield a usable answer.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error(transparent)]
    Decode(#[from] PreprocessError),

    #[error("No confident OCR result (read {raw:?})")]
    LowConfidence { raw: String },

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl CaptchaError {
    /// A missing OCR engine will not fix itself on the next CAPTCHA.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptchaError::Ocr(OcrError::BackendNotAvailable(_)))
    }
}

/// Turns a CAPTCHA image into an answer worth submitting.
///
/// Implementations are blocking; the driver runs them off the async runtime.
pub trait CaptchaSolver: Send + Sync {
    fn name(&self) -> String;

    fn solve(&self, image_bytes: &[u8]) -> Result<String, CaptchaError>;
}

/// Solver composed of a preprocessor and an OCR backend.
pub struct OcrCaptchaSolver {
    preprocessor: Box<dyn Preprocessor>,
    backend: Box<dyn OcrBackend>,
    min_length: usize,
}

impl OcrCaptchaSolver {
    pub fn new(
        preprocessor: Box<dyn Preprocessor>,
        backend: Box<dyn OcrBackend>,
        min_length: usize,
    ) -> Self {
        Self {
            preprocessor,
            backend,
            min_length,
        }
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }
}

impl CaptchaSolver for OcrCaptchaSolver {
    fn name(&self) -> String {
        format!(
            "{:?}+{}",
            self.preprocessor.kind(),
            self.backend.backend_type()
        )
        .to_lowercase()
    }

    /// Read the binarized image first. If that pass yields nothing usable,
    /// read the plain grayscale image once more before giving up.
    fn solve(&self, image_bytes: &[u8]) -> Result<String, CaptchaError> {
        let binary = self.preprocessor.preprocess(image_bytes)?;
        let first = self.backend.recognize(&binary)?;
        if let Some(answer) = self.check(&first, "preprocessed") {
            return Ok(answer);
        }

        let gray = decode_grayscale(image_bytes)?;
        let second = self.backend.recognize(&gray)?;
        self.check(&second, "raw").ok_or(CaptchaError::LowConfidence {
            raw: first.text.trim().to_string(),
        })
    }
}

impl OcrCaptchaSolver {
    fn check(&self, result: &OcrResult, pass: &str) -> Option<String> {
        let candidate = accept_candidate(&result.text, self.min_length);
        debug!(
            pass,
            raw = %result.text.trim(),
            accepted = candidate.is_some(),
            "OCR pass finished in {}ms",
            result.processing_time_ms
        );
        candidate
    }
}

/// Strip everything that is not an ASCII letter or digit.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Cleaned text, if it is longer than `min_length` characters.
pub fn accept_candidate(raw: &str, min_length: usize) -> Option<String> {
    let cleaned = sanitize(raw);
    (cleaned.len() > min_length).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::super::backend::OcrBackendType;
    use super::super::preprocess::{encode_png, ThresholdPreprocessor};
    use super::*;

    struct FixedBackend(&'static str);

    impl OcrBackend for FixedBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn recognize(&self, _image: &GrayImage) -> Result<OcrResult, OcrError> {
            Ok(OcrResult {
                text: self.0.to_string(),
                confidence: None,
                backend: OcrBackendType::Tesseract,
                processing_time_ms: 0,
            })
        }
    }

    /// Answers from a script, one per pass.
    struct ScriptedBackend(Mutex<VecDeque<&'static str>>);

    impl OcrBackend for ScriptedBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn recognize(&self, _image: &GrayImage) -> Result<OcrResult, OcrError> {
            let text = self.0.lock().unwrap().pop_front().unwrap_or_default();
            Ok(OcrResult {
                text: text.to_string(),
                confidence: None,
                backend: OcrBackendType::Tesseract,
                processing_time_ms: 0,
            })
        }
    }

    fn solver(text: &'static str) -> OcrCaptchaSolver {
        OcrCaptchaSolver::new(
            Box::new(ThresholdPreprocessor::default()),
            Box::new(FixedBackend(text)),
            3,
        )
    }

    fn blank_png() -> Vec<u8> {
        encode_png(&GrayImage::new(30, 10)).unwrap()
    }

    #[test]
    fn test_sanitize_strips_noise() {
        assert_eq!(sanitize(" a7-k2 x\n"), "a7k2x");
        assert_eq!(sanitize("‘9q!z’"), "9qz");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_accept_requires_more_than_min_length() {
        assert_eq!(accept_candidate("abc", 3), None);
        assert_eq!(accept_candidate("a-b-c", 3), None);
        assert_eq!(accept_candidate("ab3d", 3), Some("ab3d".to_string()));
    }

    #[test]
    fn test_solver_returns_clean_candidate() {
        let answer = solver("x7 k9q\n").solve(&blank_png()).unwrap();
        assert_eq!(answer, "x7k9q");
    }

    #[test]
    fn test_solver_low_confidence() {
        let err = solver("?!").solve(&blank_png()).unwrap_err();
        assert!(matches!(err, CaptchaError::LowConfidence { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_solver_decode_error() {
        let err = solver("abcd").solve(b"\x00\x01garbage").unwrap_err();
        assert!(matches!(err, CaptchaError::Decode(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_solver_name() {
        assert_eq!(solver("abcd").name(), "threshold+tesseract");
    }

    #[test]
    fn test_solver_falls_back_to_raw_image() {
        let backend = ScriptedBackend(Mutex::new(VecDeque::from(["?!", "k4m9"])));
        let solver = OcrCaptchaSolver::new(
            Box::new(ThresholdPreprocessor::default()),
            Box::new(backend),
            3,
        );
        assert_eq!(solver.solve(&blank_png()).unwrap(), "k4m9");
    }

    #[test]
    fn test_solver_reports_first_pass_when_both_fail() {
        let backend = ScriptedBackend(Mutex::new(VecDeque::from(["a!", "zz"])));
        let solver = OcrCaptchaSolver::new(
            Box::new(ThresholdPreprocessor::default()),
            Box::new(backend),
            3,
        );
        match solver.solve(&blank_png()).unwrap_err() {
            CaptchaError::LowConfidence { raw } => assert_eq!(raw, "a!"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
