//! Fixture-backed provider for development without network or Chrome.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::CaseProvider;
use crate::models::{CaseQuery, CaseRecord, SearchOutcome};

const BUNDLED_CASES: &str = include_str!("../../fixtures/mock_cases.json");

/// Serves records from a static table keyed by [`CaseQuery::lookup_key`].
#[derive(Debug, Clone)]
pub struct MockProvider {
    cases: HashMap<String, CaseRecord>,
}

impl MockProvider {
    /// Provider over the bundled sample cases.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_CASES)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cases = serde_json::from_str(json)?;
        Ok(Self { cases })
    }

    pub fn from_records(cases: impl IntoIterator<Item = (String, CaseRecord)>) -> Self {
        Self {
            cases: cases.into_iter().collect(),
        }
    }

    /// Lookup keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.cases.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[async_trait]
impl CaseProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, query: &CaseQuery) -> SearchOutcome {
        let key = query.lookup_key();
        debug!(%key, "Mock lookup");
        match self.cases.get(&key) {
            Some(record) => SearchOutcome::Success(record.clone()),
            None => SearchOutcome::not_found(format!("no record for {}", query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_fixtures_parse() {
        let provider = MockProvider::bundled().unwrap();
        assert_eq!(provider.len(), 8);
        assert!(provider.keys().contains(&"CRL.A.567.2023"));
    }

    #[test]
    fn test_every_bundled_key_is_reachable() {
        let provider = MockProvider::bundled().unwrap();
        for key in provider.keys() {
            let record = &provider.cases[key];
            let (number, year) = record.case_number.split_once('/').unwrap();
            let query = CaseQuery::parse(&record.case_type, number, year).unwrap();
            assert_eq!(query.lookup_key(), key);
        }
    }

    #[tokio::test]
    async fn test_trailing_dot_variants_hit_same_fixture() {
        let provider = MockProvider::bundled().unwrap();
        let a = CaseQuery::parse("CRL.A.", "567", "2023").unwrap();
        let b = CaseQuery::parse("CRL.A", "567", "2023").unwrap();
        assert_eq!(provider.search(&a).await, provider.search(&b).await);
        assert!(provider.search(&a).await.is_success());
    }
}
