//! Data models for case status lookups.

mod outcome;
mod query;
mod record;

pub use outcome::{SearchOutcome, SearchResponse};
pub use query::{normalize_case_type_label, CaseQuery, CaseType, QueryError};
pub use record::{CaptchaAttempt, CaseRecord, HistoryEntry, PdfLink};
