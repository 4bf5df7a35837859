//! Case details extraction from the portal's result page.
//!
//! The extractor only builds a [`CaseRecord`] from a page that actually
//! carries a results table with at least one recognised row. Anything else is
//! reported as [`ExtractError::NotFound`] so a garbled page never turns into a
//! half-empty success.

mod history;
mod links;
mod parties;
mod table;

pub use history::read_history;
pub use links::{discover_pdf_links, extract_date, resolve_pdf_url};
pub use parties::split_parties;
pub use table::{match_label, normalize_label, Field};

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{CaseQuery, CaseRecord};
use crate::portal::SiteProfile;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("Invalid base URL: {0}")]
    BaseUrl(String),
}

/// What a page looks like after the form was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// A results table is present.
    Results,
    /// The portal rejected the CAPTCHA answer.
    Rejected,
    /// The submission was accepted but matched no case.
    NoRecord,
    /// Nothing conclusive yet.
    Pending,
}

/// Element text with runs of whitespace collapsed to single spaces.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selectors(raw: &[String]) -> Result<Vec<Selector>, ExtractError> {
    raw.iter()
        .map(|s| Selector::parse(s).map_err(|e| ExtractError::Selector(format!("{:?}: {}", s, e))))
        .collect()
}

/// Parses result pages using the selectors and markers of a [`SiteProfile`].
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    base_url: Url,
    results: Vec<Selector>,
    history: Vec<Selector>,
    rejected_markers: Vec<String>,
    no_record_markers: Vec<String>,
}

impl ResponseExtractor {
    pub fn new(site: &SiteProfile) -> Result<Self, ExtractError> {
        let base_url =
            Url::parse(&site.base_url).map_err(|e| ExtractError::BaseUrl(e.to_string()))?;
        let lower = |v: &[String]| v.iter().map(|m| m.to_lowercase()).collect::<Vec<_>>();
        Ok(Self {
            base_url,
            results: parse_selectors(&site.results_table_selectors)?,
            history: parse_selectors(&site.history_table_selectors)?,
            rejected_markers: lower(&site.captcha_rejected_markers),
            no_record_markers: lower(&site.no_record_markers),
        })
    }

    fn results_table<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.results
            .iter()
            .find_map(|selector| document.select(selector).next())
    }

    /// Classify a post-submit page.
    ///
    /// Rejection markers are checked first because the portal re-renders the
    /// form (and sometimes stale results) alongside the error message.
    pub fn classify(&self, html: &str) -> PageSignal {
        let lower = html.to_lowercase();
        if self.rejected_markers.iter().any(|m| lower.contains(m)) {
            return PageSignal::Rejected;
        }
        if self.no_record_markers.iter().any(|m| lower.contains(m)) {
            return PageSignal::NoRecord;
        }
        let document = Html::parse_document(html);
        if self.results_table(&document).is_some() {
            PageSignal::Results
        } else {
            PageSignal::Pending
        }
    }

    /// Build a record from a result page.
    pub fn extract(&self, html: &str, query: &CaseQuery) -> Result<CaseRecord, ExtractError> {
        let document = Html::parse_document(html);

        let table = self.results_table(&document).ok_or_else(|| {
            ExtractError::NotFound(format!("No results table for {}", query))
        })?;

        let rows = table::read_rows(table);
        if rows.is_empty() {
            return Err(ExtractError::NotFound(format!(
                "Results table for {} has no recognised rows",
                query
            )));
        }

        let mut record = CaseRecord::default();
        for (field, value) in rows {
            table::assign(&mut record, field, value);
        }

        if record.case_number.is_empty() {
            record.case_number = query.display_number();
        }
        if record.case_type.is_empty() {
            record.case_type = query.case_type().site_label().to_string();
        }

        if let Some((petitioner, respondent)) =
            record.case_title.as_deref().and_then(split_parties)
        {
            record.petitioner_name.get_or_insert(petitioner);
            record.respondent_name.get_or_insert(respondent);
        }

        record.pdf_links = discover_pdf_links(&document, &self.base_url);
        record.case_history = self
            .history
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(read_history)
            .find(|entries| !entries.is_empty())
            .unwrap_or_default();

        debug!(
            fields = record.populated_fields(),
            pdf_links = record.pdf_links.len(),
            history = record.case_history.len(),
            "Extracted case record"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaseType;

    fn extractor() -> ResponseExtractor {
        ResponseExtractor::new(&SiteProfile::default()).unwrap()
    }

    fn query() -> CaseQuery {
        CaseQuery::new(CaseType::WritPetitionCivil, "1234", "2024").unwrap()
    }

    const RESULTS: &str = r#"<html><body>
        <table class="case-details">
            <tr><td>Case Title</td><td>A vs B</td></tr>
            <tr><td>Filing Date</td><td>01/01/2024</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html = Html::parse_fragment("<p>  Order\n\t dated   1/2/2024 </p>");
        let p = html.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(element_text(&p), "Order dated 1/2/2024");
    }

    #[test]
    fn test_extract_title_and_filing_date() {
        let record = extractor().extract(RESULTS, &query()).unwrap();
        assert_eq!(record.petitioner_name.as_deref(), Some("A"));
        assert_eq!(record.respondent_name.as_deref(), Some("B"));
        assert_eq!(record.filing_date.as_deref(), Some("01/01/2024"));
        assert_eq!(record.case_number, "1234/2024");
        assert_eq!(record.case_type, "W.P.(C)");
    }

    #[test]
    fn test_explicit_parties_win_over_title_split() {
        let html = r#"<table class="case-details">
            <tr><td>Case Title</td><td>A vs B</td></tr>
            <tr><td>Petitioner</td><td>A Ltd.</td></tr>
        </table>"#;
        let record = extractor().extract(html, &query()).unwrap();
        assert_eq!(record.petitioner_name.as_deref(), Some("A Ltd."));
        assert_eq!(record.respondent_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let err = extractor()
            .extract("<html><body><p>Welcome</p></body></html>", &query())
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_table_without_known_rows_is_not_found() {
        let html = r#"<table class="case-details"><tr><td>Advocate</td><td>X</td></tr></table>"#;
        assert!(matches!(
            extractor().extract(html, &query()),
            Err(ExtractError::NotFound(_))
        ));
    }

    #[test]
    fn test_classify() {
        let ex = extractor();
        assert_eq!(ex.classify(RESULTS), PageSignal::Results);
        assert_eq!(
            ex.classify("<div class='alert'>Invalid Captcha!</div>"),
            PageSignal::Rejected
        );
        assert_eq!(
            ex.classify("<p>No Record Found</p>"),
            PageSignal::NoRecord
        );
        assert_eq!(ex.classify("<form></form>"), PageSignal::Pending);
    }

    #[test]
    fn test_bad_selector_is_reported() {
        let site = SiteProfile {
            results_table_selectors: vec!["table[[".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ResponseExtractor::new(&site),
            Err(ExtractError::Selector(_))
        ));
    }
}
