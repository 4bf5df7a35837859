//! Normalized case records.

use serde::{Deserialize, Serialize};

/// A downloadable order or judgment linked from the case page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
    pub title: String,
    pub url: String,
    /// Date embedded in the link text, if one could be recognised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// One entry in the case's hearing history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// Normalized result of a case lookup.
///
/// Every field except `case_number` and `case_type` is optional; `None`
/// means the portal did not show it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_number: String,
    pub case_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub petitioner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respondent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hearing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_hall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_order: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pdf_links: Vec<PdfLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub case_history: Vec<HistoryEntry>,
}

impl CaseRecord {
    pub fn new(case_number: impl Into<String>, case_type: impl Into<String>) -> Self {
        Self {
            case_number: case_number.into(),
            case_type: case_type.into(),
            ..Default::default()
        }
    }

    /// Number of optional scalar fields that were filled in.
    pub fn populated_fields(&self) -> usize {
        self.scalar_fields()
            .iter()
            .skip(2)
            .filter(|(_, v)| v.is_some())
            .count()
    }

    /// All scalar fields as `(name, value)` pairs, in display order.
    pub fn scalar_fields(&self) -> [(&'static str, Option<&str>); 12] {
        [
            ("case_number", Some(self.case_number.as_str())),
            ("case_type", Some(self.case_type.as_str())),
            ("case_title", self.case_title.as_deref()),
            ("petitioner_name", self.petitioner_name.as_deref()),
            ("respondent_name", self.respondent_name.as_deref()),
            ("filing_date", self.filing_date.as_deref()),
            ("next_hearing_date", self.next_hearing_date.as_deref()),
            ("case_status", self.case_status.as_deref()),
            ("judge_name", self.judge_name.as_deref()),
            ("court_hall", self.court_hall.as_deref()),
            ("last_order_date", self.last_order_date.as_deref()),
            ("latest_order", self.latest_order.as_deref()),
        ]
    }
}

/// One CAPTCHA attempt within a single search. Never persisted.
#[derive(Debug, Clone)]
pub struct CaptchaAttempt {
    pub image_bytes: Vec<u8>,
    pub ocr_text: Option<String>,
    pub accepted: bool,
}

impl CaptchaAttempt {
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self {
            image_bytes,
            ocr_text: None,
            accepted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populated_fields_ignores_identity() {
        let mut record = CaseRecord::new("1/2024", "RFA");
        assert_eq!(record.populated_fields(), 0);
        record.case_status = Some("Pending".to_string());
        record.judge_name = Some("Hon'ble Justice X".to_string());
        assert_eq!(record.populated_fields(), 2);
    }

    #[test]
    fn test_deserialize_sparse_fixture() {
        let record: CaseRecord = serde_json::from_str(
            r#"{"case_number": "98/2022", "case_type": "RFA", "case_status": "Pending"}"#,
        )
        .unwrap();
        assert_eq!(record.case_status.as_deref(), Some("Pending"));
        assert!(record.pdf_links.is_empty());
        assert!(record.filing_date.is_none());
    }
}
