//! Delhi High Court case status lookups.
//!
//! The portal is a JavaScript-heavy form guarded by an image CAPTCHA. A
//! search drives a headless browser through the form, solves the CAPTCHA
//! with image preprocessing and Tesseract, and extracts a normalized
//! [`models::CaseRecord`] from the result page. A fixture-backed provider
//! serves the same contract without network or browser access.

pub mod config;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod portal;
pub mod provider;
pub mod service;

pub use config::Config;
pub use models::{CaseQuery, CaseRecord, CaseType, SearchOutcome, SearchResponse};
pub use provider::{CaseProvider, LiveScraper, MockProvider};
pub use service::search_case;
