//! The corp-code master-list row and the result of resolving a query
//! against it (spec.md §3 "Corp Mapping" / "Resolution Result").

use serde::{Deserialize, Serialize};

/// One row of the DART corp-code master list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpMapping {
    /// 8-digit DART registration code.
    pub corp_code: String,
    pub corp_name: String,
    /// 6-digit exchange ticker, absent for unlisted entities.
    pub stock_code: Option<String>,
    /// Provider-native modify date, e.g. `"20260115"`.
    pub modify_date: String,
}

impl CorpMapping {
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.stock_code.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Which resolution strategy produced a [`ResolutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    ExactTicker,
    ExactCode,
    ExactName,
    FuzzyName,
}

/// The outcome of [`crate::resolver::CorpCodeResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub mapping: CorpMapping,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub match_type: MatchType,
    pub alternatives: Vec<CorpMapping>,
}
