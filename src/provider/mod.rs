//! Case data providers.
//!
//! Callers see one contract, [`CaseProvider::search`], whether the data comes
//! from the live portal or from the bundled fixtures.

mod live;
mod mock;

pub use live::LiveScraper;
pub use mock::MockProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CaseQuery, SearchOutcome};

/// Which provider serves searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Live,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Live => "live",
            ProviderKind::Mock => "mock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Some(ProviderKind::Live),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source of case status lookups.
#[async_trait]
pub trait CaseProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &CaseQuery) -> SearchOutcome;
}
