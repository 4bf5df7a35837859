//! Headless Chrome sessions over the DevTools protocol.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::session::{DriverError, PortalSession, SessionLauncher};
use super::site::SiteProfile;

/// Browser launch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window.
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    pub proxy: Option<String>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    pub remote_url: Option<String>,
    /// Explicit Chrome binary; otherwise common locations and `PATH` are searched.
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            proxy: None,
            chrome_args: Vec::new(),
            remote_url: None,
            chrome_path: None,
        }
    }
}

/// JS that picks a `<select>` option by its visible label.
///
/// Trailing punctuation is ignored on both sides because the portal lists
/// some types as "W.P.(C)" and others as "CRL.A.".
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn select_option_script(selector: &str, label: &str) -> String {
    let selector = serde_json::Value::String(selector.to_string());
    let label = serde_json::Value::String(label.to_string());
    format!(
        r#"(() => {{
    const norm = s => (s || '').trim().replace(/[\s.,;:\-]+$/, '').replace(/\s+/g, ' ').toUpperCase();
    const el = document.querySelector({selector});
    if (!el) return 'missing';
    const want = norm({label});
    if (el.tagName !== 'SELECT') {{
        el.value = {label};
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
        return 'ok';
    }}
    for (const opt of el.options) {{
        if (norm(opt.text) === want || norm(opt.value) === want) {{
            el.value = opt.value;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }}
    }}
    return 'unsupported';
}})()"#
    )
}

/// JS that clears an input.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn clear_input_script(selector: &str) -> String {
    let selector = serde_json::Value::String(selector.to_string());
    format!(
        "(() => {{ const el = document.querySelector({selector}); if (!el) return 'missing'; el.value = ''; return 'ok'; }})()"
    )
}

#[cfg(feature = "browser")]
mod chromium {
    use std::time::Duration;

    use anyhow::Context;
    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::element::Element;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;
    use tracing::{debug, info, warn};

    use super::{clear_input_script, select_option_script, BrowserSettings};
    use crate::models::CaseQuery;
    use crate::portal::session::{DriverError, PortalSession};
    use crate::portal::site::SiteProfile;

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    fn browser_err(e: impl std::fmt::Display) -> DriverError {
        DriverError::Browser(e.to_string())
    }

    pub(super) fn find_chrome(settings: &BrowserSettings) -> Result<std::path::PathBuf, DriverError> {
        if let Some(path) = &settings.chrome_path {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
            return Ok(expanded.into());
        }

        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(DriverError::Launch(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set browser.chrome_path in the config"
                .to_string(),
        ))
    }

    fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        })
    }

    pub(super) async fn launch(
        settings: &BrowserSettings,
        request_timeout: Duration,
    ) -> anyhow::Result<(Browser, JoinHandle<()>, bool)> {
        if let Some(remote_url) = &settings.remote_url {
            let (browser, handle) = connect_remote(remote_url, request_timeout).await?;
            return Ok((browser, handle, true));
        }

        info!("Launching browser (headless={})", settings.headless);
        let chrome_path = find_chrome(settings)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(request_timeout);

        // with_head means NOT headless
        if !settings.headless {
            builder = builder.with_head();
        }

        if let Some(proxy) = &settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate");

        for arg in &settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        Ok((browser, spawn_handler(handler), false))
    }

    async fn connect_remote(
        url: &str,
        request_timeout: Duration,
    ) -> anyhow::Result<(Browser, JoinHandle<()>)> {
        info!("Connecting to remote browser at {}", url);

        // The WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(request_timeout)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout,
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        Ok((browser, spawn_handler(handler)))
    }

    /// One Chrome tab driven through the portal form.
    pub struct ChromiumSession {
        pub(super) browser: Option<Browser>,
        pub(super) handler: Option<JoinHandle<()>>,
        pub(super) page: Option<Page>,
        pub(super) remote: bool,
        pub(super) site: SiteProfile,
        pub(super) page_load: Duration,
        pub(super) poll_interval: Duration,
    }

    impl ChromiumSession {
        fn page(&self) -> Result<&Page, DriverError> {
            self.page
                .as_ref()
                .ok_or_else(|| DriverError::Browser("form page is not open".to_string()))
        }

        async fn element(&self, selector: &str) -> Result<Element, DriverError> {
            self.page()?
                .find_element(selector)
                .await
                .map_err(|_| DriverError::ElementMissing(selector.to_string()))
        }

        /// Poll until `selector` matches or the page-load timeout passes.
        async fn wait_for(&self, selector: &str) -> Result<Element, DriverError> {
            let page = self.page()?;
            let give_up = Instant::now() + self.page_load;
            loop {
                if let Ok(element) = page.find_element(selector).await {
                    return Ok(element);
                }
                if Instant::now() >= give_up {
                    return Err(DriverError::NavigationTimeout(selector.to_string()));
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        async fn run_script(&self, script: String) -> Result<String, DriverError> {
            self.page()?
                .evaluate(script)
                .await
                .map_err(browser_err)?
                .into_value::<String>()
                .map_err(browser_err)
        }
    }

    #[async_trait]
    impl PortalSession for ChromiumSession {
        async fn open_form(&mut self) -> Result<(), DriverError> {
            let url = self.site.case_status_url.clone();
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| DriverError::Browser("browser is closed".to_string()))?;

            info!("Navigating to {}", url);
            let page = match tokio::time::timeout(self.page_load, browser.new_page(url.as_str()))
                .await
            {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => return Err(DriverError::Network(e.to_string())),
                Err(_) => return Err(DriverError::NavigationTimeout(url)),
            };
            self.page = Some(page);

            let selector = self.site.case_type_selector.clone();
            self.wait_for(&selector).await?;
            debug!("Case status form ready");
            Ok(())
        }

        async fn fill_form(&mut self, query: &CaseQuery) -> Result<(), DriverError> {
            let label = query.case_type().site_label();
            let script = select_option_script(&self.site.case_type_selector, label);
            match self.run_script(script).await?.as_str() {
                "ok" => {}
                "missing" => {
                    return Err(DriverError::ElementMissing(
                        self.site.case_type_selector.clone(),
                    ))
                }
                _ => return Err(DriverError::UnsupportedCaseType(label.to_string())),
            }

            self.run_script(clear_input_script(&self.site.case_number_selector))
                .await?;
            self.element(&self.site.case_number_selector)
                .await?
                .click()
                .await
                .map_err(browser_err)?
                .type_str(query.case_number())
                .await
                .map_err(browser_err)?;

            let script = select_option_script(&self.site.filing_year_selector, query.filing_year());
            if self.run_script(script).await? != "ok" {
                return Err(DriverError::ElementMissing(
                    self.site.filing_year_selector.clone(),
                ));
            }

            debug!("Form filled for {}", query);
            Ok(())
        }

        async fn captcha_image(&mut self) -> Result<Vec<u8>, DriverError> {
            let selector = self.site.captcha_image_selector.clone();
            self.wait_for(&selector)
                .await?
                .screenshot(CaptureScreenshotFormat::Png)
                .await
                .map_err(browser_err)
        }

        async fn reload_captcha(&mut self) -> Result<(), DriverError> {
            self.element(&self.site.captcha_reload_selector)
                .await?
                .click()
                .await
                .map_err(browser_err)?;
            Ok(())
        }

        async fn submit(&mut self, answer: &str) -> Result<(), DriverError> {
            self.run_script(clear_input_script(&self.site.captcha_input_selector))
                .await?;
            self.element(&self.site.captcha_input_selector)
                .await?
                .click()
                .await
                .map_err(browser_err)?
                .type_str(answer)
                .await
                .map_err(browser_err)?;
            self.element(&self.site.submit_selector)
                .await?
                .click()
                .await
                .map_err(browser_err)?;
            Ok(())
        }

        async fn page_content(&mut self) -> Result<String, DriverError> {
            self.page()?.content().await.map_err(browser_err)
        }

        async fn close(&mut self) {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    debug!("Failed to close page: {}", e);
                }
            }
            if let Some(mut browser) = self.browser.take() {
                // A remote browser belongs to someone else; only our tab goes.
                if !self.remote {
                    if let Err(e) = browser.close().await {
                        warn!("Failed to close browser: {}", e);
                    }
                    let _ = browser.wait().await;
                }
            }
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
        }
    }
}

/// Launches a fresh Chrome session per search.
pub struct ChromiumLauncher {
    settings: BrowserSettings,
    site: SiteProfile,
    page_load: Duration,
    poll_interval: Duration,
}

impl ChromiumLauncher {
    pub fn new(
        settings: BrowserSettings,
        site: SiteProfile,
        page_load: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            settings,
            site,
            page_load,
            poll_interval,
        }
    }
}

#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;

#[cfg(feature = "browser")]
#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PortalSession>, DriverError> {
        let (browser, handler, remote) = chromium::launch(&self.settings, self.page_load)
            .await
            .map_err(|e| DriverError::Launch(format!("{:#}", e)))?;

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            handler: Some(handler),
            page: None,
            remote,
            site: self.site.clone(),
            page_load: self.page_load,
            poll_interval: self.poll_interval,
        }))
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PortalSession>, DriverError> {
        let _ = (&self.settings, &self.site, self.page_load, self.poll_interval);
        Err(DriverError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_script_escapes_arguments() {
        let script = select_option_script("select[name='case_type']", "W.P.(C)");
        assert!(script.contains(r#"document.querySelector("select[name='case_type']")"#));
        assert!(script.contains(r#"norm("W.P.(C)")"#));

        let script = select_option_script("#x", "a\"b");
        assert!(script.contains(r#"norm("a\"b")"#));
    }

    #[test]
    fn test_browser_settings_defaults() {
        let settings: BrowserSettings = toml::from_str("headless = false").unwrap();
        assert!(!settings.headless);
        assert_eq!((settings.window_width, settings.window_height), (1366, 768));
        assert!(settings.remote_url.is_none());
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_stub_launcher_reports_missing_feature() {
        let launcher = ChromiumLauncher::new(
            BrowserSettings::default(),
            SiteProfile::default(),
            Duration::from_secs(1),
            Duration::from_millis(10),
        );
        assert!(matches!(launcher.launch().await, Err(DriverError::Launch(_))));
    }
}
