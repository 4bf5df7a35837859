//! Configuration loading using the prefer crate for discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ocr::{
    build_backend, build_preprocessor, OcrBackendType, OcrCaptchaSolver, OcrConfig,
    PreprocessSettings, PreprocessorKind, CAPTCHA_CHARSET,
};
use crate::portal::{BrowserSettings, DriverPolicy, SiteProfile};
use crate::provider::{CaseProvider, LiveScraper, MockProvider, ProviderKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// CAPTCHA solving settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaSettings {
    /// Attempts per search before giving up.
    pub max_attempts: u32,
    /// Answers must be longer than this many characters.
    pub min_length: usize,
    pub preprocessor: PreprocessorKind,
    /// Luminance cutoff for the threshold preprocessor.
    pub threshold: u8,
    pub contrast: f32,
    pub invert: bool,
    pub scale: u32,
    pub language: String,
    pub page_seg_mode: u8,
    pub whitelist: String,
    pub tesseract_path: Option<PathBuf>,
}

impl Default for CaptchaSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_length: 3,
            preprocessor: PreprocessorKind::Threshold,
            threshold: 150,
            contrast: 40.0,
            invert: false,
            scale: 1,
            language: "eng".to_string(),
            page_seg_mode: 8,
            whitelist: CAPTCHA_CHARSET.to_string(),
            tesseract_path: None,
        }
    }
}

impl CaptchaSettings {
    pub fn preprocess_settings(&self) -> PreprocessSettings {
        PreprocessSettings {
            contrast: self.contrast,
            invert: self.invert,
            scale: self.scale.max(1),
        }
    }

    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.language.clone(),
            page_seg_mode: self.page_seg_mode,
            whitelist: self.whitelist.clone(),
            binary_path: self
                .tesseract_path
                .as_ref()
                .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref())),
        }
    }

    /// Preprocessor plus Tesseract, as configured.
    pub fn build_solver(&self) -> OcrCaptchaSolver {
        OcrCaptchaSolver::new(
            build_preprocessor(self.preprocessor, self.threshold, self.preprocess_settings()),
            build_backend(OcrBackendType::Tesseract, self.ocr_config()),
            self.min_length,
        )
    }
}

/// Per-step timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub page_load_secs: u64,
    pub submit_secs: u64,
    pub reload_delay_ms: u64,
    pub poll_interval_ms: u64,
    /// Hard limit for a whole search; derived from the others when unset.
    pub deadline_secs: Option<u64>,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            submit_secs: 10,
            reload_delay_ms: 1500,
            poll_interval_ms: 250,
            deadline_secs: None,
        }
    }
}

impl TimeoutSettings {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Explicit deadline, or page load plus every submit wait plus 30s slack.
    pub fn deadline(&self, max_attempts: u32) -> Duration {
        let secs = self.deadline_secs.unwrap_or(
            self.page_load_secs + self.submit_secs * u64::from(max_attempts) + 30,
        );
        Duration::from_secs(secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub captcha: CaptchaSettings,
    pub timeouts: TimeoutSettings,
    pub browser: BrowserSettings,
    pub site: SiteProfile,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    ///
    /// An explicit path must load cleanly. A discovered file that fails to
    /// parse is reported and replaced by defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
                Self::load_from_path(Path::new(&expanded)).await?
            }
            None => Self::discover().await,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    async fn discover() -> Self {
        match prefer::load("dhc").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(e) => {
                debug!("No config file found: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// The format follows the file extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_err("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_err("JSON", e.to_string())),
        }
    }

    /// Apply `DHC_*` environment overrides. Unparseable values are ignored
    /// with a warning.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var("DHC_PROVIDER") {
            match ProviderKind::from_str(&value) {
                Some(kind) => self.provider = kind,
                None => warn!("Ignoring DHC_PROVIDER={:?} (expected live or mock)", value),
            }
        }
        if let Some(value) = var("DHC_CAPTCHA_ATTEMPTS") {
            match value.trim().parse() {
                Ok(n) => self.captcha.max_attempts = n,
                Err(_) => warn!("Ignoring DHC_CAPTCHA_ATTEMPTS={:?}", value),
            }
        }
        if let Some(value) = var("DHC_CHROME_REMOTE_URL") {
            let value = value.trim();
            self.browser.remote_url = (!value.is_empty()).then(|| value.to_string());
        }
        if let Some(value) = var("DHC_HEADLESS") {
            match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.browser.headless = true,
                "0" | "false" | "no" => self.browser.headless = false,
                _ => warn!("Ignoring DHC_HEADLESS={:?}", value),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.captcha.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "captcha.max_attempts must be at least 1".to_string(),
            ));
        }
        let t = &self.timeouts;
        if t.page_load_secs == 0
            || t.submit_secs == 0
            || t.poll_interval_ms == 0
            || t.deadline_secs == Some(0)
        {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        self.site.validate().map_err(ConfigError::Invalid)
    }

    pub fn driver_policy(&self) -> DriverPolicy {
        DriverPolicy {
            max_attempts: self.captcha.max_attempts,
            submit_timeout: Duration::from_secs(self.timeouts.submit_secs),
            reload_delay: Duration::from_millis(self.timeouts.reload_delay_ms),
            poll_interval: self.timeouts.poll_interval(),
            deadline: self.timeouts.deadline(self.captcha.max_attempts),
        }
    }

    /// Build the configured provider.
    pub fn build_provider(&self) -> anyhow::Result<Arc<dyn CaseProvider>> {
        Ok(match self.provider {
            ProviderKind::Mock => Arc::new(MockProvider::bundled()?),
            ProviderKind::Live => Arc::new(LiveScraper::from_config(self)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider, ProviderKind::Live);
        assert_eq!(config.captcha.max_attempts, 3);
        assert_eq!(config.captcha.threshold, 150);
        assert_eq!(config.timeouts.page_load_secs, 30);
        assert!(config.validate().is_ok());
        assert_eq!(config.driver_policy().deadline, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
provider = "mock"

[captcha]
max_attempts = 5
preprocessor = "otsu"

[timeouts]
deadline_secs = 120

[site]
submit_selector = "button#go"
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.captcha.max_attempts, 5);
        assert_eq!(config.captcha.preprocessor, PreprocessorKind::Otsu);
        assert_eq!(config.captcha.min_length, 3);
        assert_eq!(config.site.submit_selector, "button#go");
        assert_eq!(config.driver_policy().deadline, Duration::from_secs(120));
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "browser:\n  headless: false\n  window_width: 800").unwrap();
        let config = Config::load_from_path(yaml.path()).await.unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 800);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json, r#"{{"timeouts": {{"submit_secs": 4}}}}"#).unwrap();
        let config = Config::load_from_path(json.path()).await.unwrap();
        assert_eq!(config.timeouts.submit_secs, 4);
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "provider = [").unwrap();
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Config::load_from_path(Path::new("/nonexistent/dhc.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("DHC_PROVIDER", "Mock"),
            ("DHC_CAPTCHA_ATTEMPTS", "7"),
            ("DHC_CHROME_REMOTE_URL", "ws://localhost:9222"),
            ("DHC_HEADLESS", "false"),
        ]));
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.captcha.max_attempts, 7);
        assert_eq!(config.browser.remote_url.as_deref(), Some("ws://localhost:9222"));
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_bad_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("DHC_PROVIDER", "carrier-pigeon"),
            ("DHC_CAPTCHA_ATTEMPTS", "many"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = Config::default();
        config.captcha.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.timeouts.submit_secs = 0;
        assert!(config.validate().is_err());
    }
}
