//! CAPTCHA recognition.
//!
//! The portal guards every lookup with a short lowercase-alphanumeric
//! CAPTCHA. Solving it is a two-stage pipeline:
//!
//! - **Preprocessing**: grayscale, contrast boost and binarization
//!   (`preprocess`), with fixed-threshold and Otsu strategies
//! - **Recognition**: an [`OcrBackend`] (Tesseract by default) read in
//!   single-word mode against the CAPTCHA character set
//!
//! [`OcrCaptchaSolver`] composes the two behind the [`CaptchaSolver`] trait,
//! which is what the browser driver depends on.

mod backend;
mod preprocess;
mod solver;
mod tesseract;
mod tools;

pub use backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult, CAPTCHA_CHARSET};
pub use preprocess::{
    binarize, build_preprocessor, decode_grayscale, encode_png, otsu_level, OtsuPreprocessor,
    PreprocessError, PreprocessSettings, Preprocessor, PreprocessorKind, ThresholdPreprocessor,
};
pub use solver::{accept_candidate, sanitize, CaptchaError, CaptchaSolver, OcrCaptchaSolver};
pub use tesseract::TesseractBackend;
pub use tools::check_binary;

/// Build the backend selected by configuration.
pub fn build_backend(backend_type: OcrBackendType, config: OcrConfig) -> Box<dyn OcrBackend> {
    match backend_type {
        OcrBackendType::Tesseract => Box::new(TesseractBackend::with_config(config)),
    }
}
