//! The browser session capability the driver runs against.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CaseQuery;

/// Failures talking to the portal through a browser.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    #[error("Failed to start browser: {0}")]
    Launch(String),

    #[error("Timed out waiting for {0}")]
    NavigationTimeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Case type {0:?} is not offered by the portal")]
    UnsupportedCaseType(String),
}

impl DriverError {
    /// Whether the user could reasonably try the same search again later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DriverError::UnsupportedCaseType(_))
    }
}

/// One live browser tab on the case-status form.
///
/// A session belongs to exactly one search call. The driver always calls
/// [`close`](PortalSession::close) once before dropping it.
#[async_trait]
pub trait PortalSession: Send {
    /// Load the form page and wait for the case type control.
    async fn open_form(&mut self) -> Result<(), DriverError>;

    /// Select the case type and type number and year.
    async fn fill_form(&mut self, query: &CaseQuery) -> Result<(), DriverError>;

    /// PNG screenshot of the current CAPTCHA image.
    async fn captcha_image(&mut self) -> Result<Vec<u8>, DriverError>;

    /// Ask the portal for a fresh CAPTCHA.
    async fn reload_captcha(&mut self) -> Result<(), DriverError>;

    /// Type the answer and press submit. Does not wait for the response.
    async fn submit(&mut self, answer: &str) -> Result<(), DriverError>;

    /// Current page markup.
    async fn page_content(&mut self) -> Result<String, DriverError>;

    /// Release the browser. Must be safe to call on a half-initialised session.
    async fn close(&mut self);
}

/// Creates a fresh [`PortalSession`] per search.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PortalSession>, DriverError>;
}
