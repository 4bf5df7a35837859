//! Everything specific to the court portal's markup.
//!
//! Element selectors, URLs and marker strings change whenever the portal is
//! redesigned. They all live here and can be overridden from the `[site]`
//! config section without touching the driver or the extractor.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://delhihighcourt.nic.in";
pub const DEFAULT_CASE_STATUS_URL: &str = "https://delhihighcourt.nic.in/app/get-case-type-status";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Base for resolving relative links.
    pub base_url: String,
    /// Page hosting the search form.
    pub case_status_url: String,

    pub case_type_selector: String,
    pub case_number_selector: String,
    pub filing_year_selector: String,
    pub captcha_image_selector: String,
    pub captcha_input_selector: String,
    pub captcha_reload_selector: String,
    pub submit_selector: String,

    /// Any of these marks a page that carries case results.
    pub results_table_selectors: Vec<String>,
    /// Tables holding dated hearing history rows.
    pub history_table_selectors: Vec<String>,

    /// Case-insensitive page text meaning the CAPTCHA answer was wrong.
    pub captcha_rejected_markers: Vec<String>,
    /// Case-insensitive page text meaning the search matched nothing.
    pub no_record_markers: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            case_status_url: DEFAULT_CASE_STATUS_URL.to_string(),
            case_type_selector: "select[name='case_type']".to_string(),
            case_number_selector: "input[name='case_number']".to_string(),
            filing_year_selector: "[name='case_year']".to_string(),
            captcha_image_selector: "#captcha-image".to_string(),
            captcha_input_selector: "#captchaInput".to_string(),
            captcha_reload_selector: "#refresh-captcha".to_string(),
            submit_selector: "#search".to_string(),
            results_table_selectors: vec![
                "table.case-details".to_string(),
                "table#caseTable".to_string(),
            ],
            history_table_selectors: vec![
                "table.case-history".to_string(),
                "table#caseHistory".to_string(),
            ],
            captcha_rejected_markers: vec![
                "invalid captcha".to_string(),
                "captcha mismatch".to_string(),
                "incorrect captcha".to_string(),
                "wrong captcha".to_string(),
            ],
            no_record_markers: vec![
                "no record found".to_string(),
                "no records found".to_string(),
                "no data available".to_string(),
                "record not found".to_string(),
            ],
        }
    }
}

impl SiteProfile {
    /// Check the profile's selectors parse, so a bad config fails at load time.
    pub fn validate(&self) -> Result<(), String> {
        let mut selectors = vec![
            &self.case_type_selector,
            &self.case_number_selector,
            &self.filing_year_selector,
            &self.captcha_image_selector,
            &self.captcha_input_selector,
            &self.captcha_reload_selector,
            &self.submit_selector,
        ];
        selectors.extend(self.results_table_selectors.iter());
        selectors.extend(self.history_table_selectors.iter());

        for selector in selectors {
            scraper::Selector::parse(selector)
                .map_err(|e| format!("invalid selector {:?}: {}", selector, e))?;
        }

        if self.results_table_selectors.is_empty() {
            return Err("at least one results table selector is required".to_string());
        }

        url::Url::parse(&self.base_url).map_err(|e| format!("invalid base_url: {}", e))?;
        url::Url::parse(&self.case_status_url)
            .map_err(|e| format!("invalid case_status_url: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        assert_eq!(SiteProfile::default().validate(), Ok(()));
    }

    #[test]
    fn test_bad_selector_rejected() {
        let site = SiteProfile {
            submit_selector: "button[[".to_string(),
            ..Default::default()
        };
        assert!(site.validate().unwrap_err().contains("button[["));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let site: SiteProfile = toml::from_str(r##"submit_selector = "#go""##).unwrap();
        assert_eq!(site.submit_selector, "#go");
        assert_eq!(site.base_url, DEFAULT_BASE_URL);
    }
}
