//! The three parallel lookup indices spec.md §3 requires: by ticker, by
//! registration code, and by normalized name.

use ahash::AHashMap;

use crate::mapping::CorpMapping;

/// Normalizes a name for exact-name lookup: trims whitespace. Case
/// folding is not applied since Hangul has no case.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

pub struct CorpIndex {
    by_ticker: AHashMap<String, usize>,
    by_code: AHashMap<String, usize>,
    by_name: AHashMap<String, usize>,
    mappings: Vec<CorpMapping>,
}

impl CorpIndex {
    #[must_use]
    pub fn build(mappings: Vec<CorpMapping>) -> Self {
        let mut by_ticker = AHashMap::default();
        let mut by_code = AHashMap::default();
        let mut by_name = AHashMap::default();
        for (i, m) in mappings.iter().enumerate() {
            if let Some(ticker) = m.stock_code.as_deref().filter(|t| !t.is_empty()) {
                by_ticker.insert(ticker.to_string(), i);
            }
            by_code.insert(m.corp_code.clone(), i);
            by_name.insert(normalize_name(&m.corp_name), i);
        }
        Self {
            by_ticker,
            by_code,
            by_name,
            mappings,
        }
    }

    #[must_use]
    pub fn by_ticker(&self, ticker: &str) -> Option<&CorpMapping> {
        self.by_ticker.get(ticker).map(|&i| &self.mappings[i])
    }

    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&CorpMapping> {
        self.by_code.get(code).map(|&i| &self.mappings[i])
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&CorpMapping> {
        self.by_name.get(&normalize_name(name)).map(|&i| &self.mappings[i])
    }

    #[must_use]
    pub fn all(&self) -> &[CorpMapping] {
        &self.mappings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
