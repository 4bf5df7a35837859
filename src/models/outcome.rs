//! Search outcomes and the `(success, record, error)` caller contract.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::record::CaseRecord;

/// Result of one case lookup, as handed to the logging store and the
/// presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    Success(CaseRecord),
    NotFound { reason: String },
    TransientFailure { reason: String, retryable: bool },
    FatalFailure { reason: String },
}

impl SearchOutcome {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientFailure {
            reason: reason.into(),
            retryable: true,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::FatalFailure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NotFound { .. } => "not_found",
            Self::TransientFailure { .. } => "transient_failure",
            Self::FatalFailure { .. } => "fatal_failure",
        }
    }

    pub fn record(&self) -> Option<&CaseRecord> {
        match self {
            Self::Success(record) => Some(record),
            _ => None,
        }
    }

    /// User-facing error message; empty on success.
    pub fn error_message(&self) -> String {
        match self {
            Self::Success(_) => String::new(),
            Self::NotFound { reason } => format!("Case not found: {}", reason),
            Self::TransientFailure { reason, retryable } => {
                if *retryable {
                    format!("{}. Please try again.", reason)
                } else {
                    reason.clone()
                }
            }
            Self::FatalFailure { reason } => reason.clone(),
        }
    }

    /// Flatten into string key/value pairs for the external logging store.
    pub fn to_log_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("status".to_string(), self.kind().to_string());

        match self {
            Self::Success(record) => {
                for (name, value) in record.scalar_fields() {
                    if let Some(value) = value {
                        fields.insert(name.to_string(), value.to_string());
                    }
                }
                if !record.pdf_links.is_empty() {
                    fields.insert(
                        "pdf_links".to_string(),
                        serde_json::to_string(&record.pdf_links).unwrap_or_default(),
                    );
                }
                if !record.case_history.is_empty() {
                    fields.insert(
                        "case_history".to_string(),
                        serde_json::to_string(&record.case_history).unwrap_or_default(),
                    );
                }
            }
            Self::TransientFailure { retryable, .. } => {
                fields.insert("retryable".to_string(), retryable.to_string());
                fields.insert("error".to_string(), self.error_message());
            }
            _ => {
                fields.insert("error".to_string(), self.error_message());
            }
        }

        fields
    }
}

/// The flat contract consumed by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(serialize_with = "serialize_record")]
    pub record: Option<CaseRecord>,
    pub error: String,
}

fn serialize_record<S: Serializer>(record: &Option<CaseRecord>, s: S) -> Result<S::Ok, S::Error> {
    match record {
        Some(record) => record.serialize(s),
        None => s.serialize_map(Some(0))?.end(),
    }
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let error = outcome.error_message();
        match outcome {
            SearchOutcome::Success(record) => Self {
                success: true,
                record: Some(record),
                error,
            },
            _ => Self {
                success: false,
                record: None,
                error,
            },
        }
    }
}
