//! Provider backed by the live portal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::CaseProvider;
use crate::config::Config;
use crate::extract::ResponseExtractor;
use crate::models::{CaseQuery, SearchOutcome};
use crate::ocr::{CaptchaSolver, OcrBackend};
use crate::portal::{ChromiumLauncher, PortalDriver, SessionLauncher};

/// Runs each search through a fresh browser session.
pub struct LiveScraper {
    driver: PortalDriver,
    base_url: String,
    http: reqwest::Client,
    probe_timeout: Duration,
}

impl LiveScraper {
    pub fn new(driver: PortalDriver, base_url: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            probe_timeout,
        }
    }

    /// Chrome launcher, Tesseract solver and extractor from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let solver = config.captcha.build_solver();
        if !solver.backend().is_available() {
            warn!("{}", solver.backend().availability_hint());
        }
        let solver: Arc<dyn CaptchaSolver> = Arc::new(solver);

        let launcher: Arc<dyn SessionLauncher> = Arc::new(ChromiumLauncher::new(
            config.browser.clone(),
            config.site.clone(),
            config.timeouts.page_load(),
            config.timeouts.poll_interval(),
        ));
        let extractor = ResponseExtractor::new(&config.site)?;
        let driver = PortalDriver::new(launcher, solver, extractor, config.driver_policy());

        Ok(Self::new(
            driver,
            config.site.base_url.clone(),
            config.timeouts.page_load(),
        ))
    }

    pub fn driver(&self) -> &PortalDriver {
        &self.driver
    }

    /// Quick reachability check of the portal, without a browser.
    ///
    /// Returns the HTTP status on any response, even a non-2xx one.
    pub async fn check_connection(&self) -> Result<u16, reqwest::Error> {
        let response = self
            .http
            .get(&self.base_url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        info!("Portal responded with HTTP {}", status);
        Ok(status)
    }
}

#[async_trait]
impl CaseProvider for LiveScraper {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn search(&self, query: &CaseQuery) -> SearchOutcome {
        self.driver.run(query).await
    }
}
