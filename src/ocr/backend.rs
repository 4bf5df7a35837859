//! OCR engine abstraction.
//!
//! The CAPTCHA solver only needs "image in, text out"; engines plug in
//! behind [`OcrBackend`] and are picked by configuration.

use image::GrayImage;
use thiserror::Error;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result of OCR processing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Raw recognised text, before sanitising.
    pub text: String,
    /// Confidence score (0.0 - 100.0), if the engine reported one.
    pub confidence: Option<f32>,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    #[default]
    Tesseract,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (binaries installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Recognise a single line of text in a preprocessed image.
    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, OcrError>;
}

/// Engine settings for CAPTCHA recognition.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng").
    pub language: String,
    /// Tesseract page segmentation mode (7 = single line, 8 = single word).
    pub page_seg_mode: u8,
    /// Characters the engine is allowed to emit.
    pub whitelist: String,
    /// Explicit path to the engine binary; PATH lookup when unset.
    pub binary_path: Option<std::path::PathBuf>,
}

pub const CAPTCHA_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            page_seg_mode: 8,
            whitelist: CAPTCHA_CHARSET.to_string(),
            binary_path: None,
        }
    }
}
