//! The `search_case(case_type, case_number, filing_year)` entry point used by
//! front ends.

use tracing::warn;

use crate::models::{CaseQuery, QueryError, SearchOutcome, SearchResponse};
use crate::provider::CaseProvider;

/// Validate raw form input and run the search.
///
/// Input that cannot form a valid query never reaches the provider.
pub async fn search_outcome(
    provider: &dyn CaseProvider,
    case_type: &str,
    case_number: &str,
    filing_year: &str,
) -> SearchOutcome {
    match CaseQuery::parse(case_type, case_number, filing_year) {
        Ok(query) => provider.search(&query).await,
        Err(e) => {
            warn!("Rejected query: {}", e);
            reject(e)
        }
    }
}

/// [`search_outcome`] flattened into the `(success, record, error)` contract.
pub async fn search_case(
    provider: &dyn CaseProvider,
    case_type: &str,
    case_number: &str,
    filing_year: &str,
) -> SearchResponse {
    search_outcome(provider, case_type, case_number, filing_year)
        .await
        .into()
}

fn reject(err: QueryError) -> SearchOutcome {
    SearchOutcome::fatal(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    #[tokio::test]
    async fn test_search_case_success() {
        let provider = MockProvider::bundled().unwrap();
        let response = search_case(&provider, "W.P.(C).", "1234", "2024").await;
        assert!(response.success);
        assert!(response.error.is_empty());
        let record = response.record.unwrap();
        assert_eq!(record.petitioner_name.as_deref(), Some("Sunita Singh"));
    }

    #[tokio::test]
    async fn test_unknown_case_type_is_fatal() {
        let provider = MockProvider::bundled().unwrap();
        let outcome = search_outcome(&provider, "XYZ", "1", "2024").await;
        assert!(matches!(outcome, SearchOutcome::FatalFailure { .. }));
        assert!(outcome.error_message().contains("XYZ"));
    }

    #[tokio::test]
    async fn test_bad_number_never_reaches_provider() {
        let provider = MockProvider::bundled().unwrap();
        let response = search_case(&provider, "RFA", "12a", "2022").await;
        assert!(!response.success);
        assert!(response.record.is_none());
        assert!(response.error.contains("12a"));
    }
}
