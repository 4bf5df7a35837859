//! PDF link discovery and embedded date recognition.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::element_text;
use crate::models::PdfLink;

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Date shapes seen in order titles, tried in order.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // D/M/YYYY, DD-MM-YYYY
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{4}\b").unwrap(),
        // YYYY-M-D, YYYY/MM/DD
        Regex::new(r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b").unwrap(),
        // D-M-YY
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2}\b").unwrap(),
    ]
});

/// Find the first date-shaped substring.
pub fn extract_date(text: &str) -> Option<String> {
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|m| m.as_str().to_string())
}

/// Resolve `href` against `base`, keeping it only if its path ends in `.pdf`.
pub fn resolve_pdf_url(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.path().to_ascii_lowercase().ends_with(".pdf").then_some(url)
}

/// Collect every anchor on the page that points at a PDF.
pub fn discover_pdf_links(document: &Html, base: &Url) -> Vec<PdfLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_pdf_url(base, href) else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            continue;
        }

        let text = element_text(&anchor);
        let date = extract_date(&text).or_else(|| extract_date(href));
        let title = if text.is_empty() {
            "Document".to_string()
        } else {
            text
        };

        links.push(PdfLink {
            title,
            url: url.to_string(),
            date,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.org").unwrap()
    }

    #[test]
    fn test_extract_date_shapes() {
        assert_eq!(extract_date("Order 10/07/2025").as_deref(), Some("10/07/2025"));
        assert_eq!(extract_date("dated 1-2-24 copy").as_deref(), Some("1-2-24"));
        assert_eq!(extract_date("judgment 2024-1-15").as_deref(), Some("2024-1-15"));
        assert_eq!(extract_date("no date here"), None);
    }

    #[test]
    fn test_four_digit_year_not_truncated() {
        assert_eq!(extract_date("2024-01-15").as_deref(), Some("2024-01-15"));
        assert_eq!(extract_date("15-01-2024").as_deref(), Some("15-01-2024"));
    }

    #[test]
    fn test_discover_relative_link() {
        let html = Html::parse_document(
            r#"<html><body><a href="/orders/x.pdf">Order 10/07/2025</a></body></html>"#,
        );
        let links = discover_pdf_links(&html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.org/orders/x.pdf");
        assert_eq!(links[0].date.as_deref(), Some("10/07/2025"));
        assert_eq!(links[0].title, "Order 10/07/2025");
    }

    #[test]
    fn test_non_pdf_and_duplicates_skipped() {
        let html = Html::parse_document(
            r#"<a href="/index.html">Home</a>
               <a href="mailto:x@y.z">Mail</a>
               <a href="https://cdn.example.org/a/B.PDF"></a>
               <a href="https://cdn.example.org/a/B.PDF">again</a>
               <a href="/orders/y.pdf?download=1">Copy</a>"#,
        );
        let links = discover_pdf_links(&html, &base());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Document");
        assert!(links[0].date.is_none());
        assert_eq!(links[1].url, "https://example.org/orders/y.pdf?download=1");
    }

    #[test]
    fn test_date_from_href_when_text_has_none() {
        let html = Html::parse_document(r#"<a href="/o/order-12-03-2024.pdf">View</a>"#);
        let links = discover_pdf_links(&html, &base());
        assert_eq!(links[0].date.as_deref(), Some("12-03-2024"));
    }
}
