//! The resolver itself: fixed-order strategy dispatch over
//! [`crate::index::CorpIndex`] (spec.md §4.8).

use crate::index::{CorpIndex, normalize_name};
use crate::jamo::jamo_similarity;
use crate::mapping::{CorpMapping, MatchType, ResolutionResult};

/// Below this length, fuzzy search is skipped entirely (spec.md §4.8).
const MIN_FUZZY_QUERY_LEN: usize = 2;

/// Fuzzy candidates scoring below this similarity are discarded.
const FUZZY_THRESHOLD: f64 = 0.7;

pub struct CorpCodeResolver {
    index: CorpIndex,
}

impl CorpCodeResolver {
    #[must_use]
    pub fn new(mappings: Vec<CorpMapping>) -> Self {
        Self {
            index: CorpIndex::build(mappings),
        }
    }

    #[must_use]
    pub fn mapping_count(&self) -> usize {
        self.index.len()
    }

    /// Resolves `query` trying, in order: exact ticker (6 digits), exact
    /// registration code (8 digits), exact name, then fuzzy jamo
    /// matching. Returns up to `max_alternatives` runners-up alongside
    /// the primary fuzzy hit.
    #[must_use]
    pub fn resolve(&self, query: &str, max_alternatives: usize) -> Option<ResolutionResult> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(mapping) = self.index.by_ticker(trimmed) {
                return Some(exact(mapping.clone(), MatchType::ExactTicker));
            }
        }

        if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(mapping) = self.index.by_code(trimmed) {
                return Some(exact(mapping.clone(), MatchType::ExactCode));
            }
        }

        if let Some(mapping) = self.index.by_name(trimmed) {
            return Some(exact(mapping.clone(), MatchType::ExactName));
        }

        self.fuzzy_resolve(trimmed, max_alternatives)
    }

    fn fuzzy_resolve(&self, query: &str, max_alternatives: usize) -> Option<ResolutionResult> {
        if normalize_name(query).chars().count() < MIN_FUZZY_QUERY_LEN {
            return None;
        }

        let mut scored: Vec<(f64, &CorpMapping)> = self
            .index
            .all()
            .iter()
            .map(|m| (jamo_similarity(query, &m.corp_name), m))
            .filter(|(score, _)| *score >= FUZZY_THRESHOLD)
            .collect();

        if scored.is_empty() {
            return None;
        }

        // Highest similarity first; ties prefer listed companies.
        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.is_listed().cmp(&a.is_listed()))
        });

        let (best_score, best) = scored[0];
        let alternatives = scored
            .iter()
            .skip(1)
            .take(max_alternatives.saturating_sub(1))
            .map(|(_, m)| (*m).clone())
            .collect();

        Some(ResolutionResult {
            mapping: best.clone(),
            confidence: best_score,
            match_type: MatchType::FuzzyName,
            alternatives,
        })
    }
}

fn exact(mapping: CorpMapping, match_type: MatchType) -> ResolutionResult {
    ResolutionResult {
        mapping,
        confidence: 1.0,
        match_type,
        alternatives: Vec::new(),
    }
}
