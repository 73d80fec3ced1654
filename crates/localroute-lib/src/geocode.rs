//! Fuzzy address resolution against a [`GazetteerStore`].
//!
//! Candidates are gathered from the inverted token index and scored by a
//! weighted mean of token overlap and edit similarity. Nothing here walks the
//! whole dataset.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::gazetteer::{GazetteerStore, PlaceRecord};
use crate::text::{char_prefix, normalize, tokens};

/// Tunables for candidate scoring. Every threshold used by the resolver lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the token-overlap component.
    pub token_weight: f64,
    /// Weight of the edit-similarity component.
    pub edit_weight: f64,
    /// Candidates scoring below this are dropped from `resolve`.
    pub min_score: f64,
    /// Lower floor used when collecting "did you mean" suggestions.
    pub suggestion_floor: f64,
    /// Shortest query token allowed to match a longer record token by prefix.
    pub min_prefix_chars: usize,
    /// Prefix length used to gather candidates for a token with no index hits.
    pub fallback_prefix_chars: usize,
    /// Longest accepted query, in characters.
    pub max_query_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            token_weight: 0.6,
            edit_weight: 0.4,
            min_score: 0.55,
            suggestion_floor: 0.3,
            min_prefix_chars: 2,
            fallback_prefix_chars: 3,
            max_query_chars: 256,
        }
    }
}

/// A scored match for one query, borrowed from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeCandidate<'a> {
    pub place: &'a PlaceRecord,
    pub score: f64,
    /// Record tokens matched by the query, in record order.
    pub matched_tokens: Vec<String>,
}

/// Resolves free-text queries to ranked gazetteer candidates.
#[derive(Debug, Clone)]
pub struct GeocodingResolver<'a> {
    store: &'a GazetteerStore,
    config: ScoringConfig,
}

impl<'a> GeocodingResolver<'a> {
    pub fn new(store: &'a GazetteerStore, config: ScoringConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Resolve a query to at most `max_results` candidates, best first.
    ///
    /// Ordering is score descending, then shorter normalized name, then id.
    /// An empty vector means nothing scored above `min_score`; it is not an
    /// error. A query that normalizes to nothing (for example punctuation
    /// only) also yields an empty vector.
    pub fn resolve(&self, query: &str, max_results: usize) -> Result<Vec<GeocodeCandidate<'a>>> {
        if max_results == 0 {
            return Err(Error::InvalidQuery {
                reason: "max_results must be at least 1".to_string(),
            });
        }
        self.check_query(query)?;

        let mut ranked = self.rank(query, self.config.min_score);
        ranked.truncate(max_results);
        debug!(query, returned = ranked.len(), "resolved query");
        Ok(ranked)
    }

    /// Raw names of the best-scoring places above `suggestion_floor`.
    /// Invalid queries have no suggestions.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        if limit == 0 || self.check_query(query).is_err() {
            return Vec::new();
        }
        let mut names: Vec<String> = Vec::with_capacity(limit);
        for candidate in self.rank(query, self.config.suggestion_floor) {
            if names.len() == limit {
                break;
            }
            if !names.iter().any(|n| n == &candidate.place.raw_name) {
                names.push(candidate.place.raw_name.clone());
            }
        }
        names
    }

    fn check_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery {
                reason: "query is empty".to_string(),
            });
        }
        let length = query.chars().count();
        if length > self.config.max_query_chars {
            return Err(Error::InvalidQuery {
                reason: format!(
                    "query is {length} characters, limit is {}",
                    self.config.max_query_chars
                ),
            });
        }
        Ok(())
    }

    fn rank(&self, query: &str, floor: f64) -> Vec<GeocodeCandidate<'a>> {
        let normalized = normalize(query);
        let query_tokens: Vec<&str> = {
            let mut seen = BTreeSet::new();
            tokens(&normalized).filter(|t| seen.insert(*t)).collect()
        };
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut hits = BTreeSet::new();
        for token in &query_tokens {
            if self.store.collect_prefix(token, &mut hits) == 0 {
                let fallback = char_prefix(token, self.config.fallback_prefix_chars);
                if fallback.len() < token.len() {
                    self.store.collect_prefix(fallback, &mut hits);
                }
            }
        }

        let mut scored: Vec<GeocodeCandidate<'a>> = hits
            .into_iter()
            .map(|index| self.store.record_at(index))
            .map(|place| self.score(&normalized, &query_tokens, place))
            .filter(|candidate| candidate.score >= floor)
            .collect();
        scored.sort_by(compare_candidates);

        debug!(
            query = %normalized,
            scored = scored.len(),
            floor,
            "ranked geocoding candidates"
        );
        scored
    }

    fn score(
        &self,
        normalized: &str,
        query_tokens: &[&str],
        place: &'a PlaceRecord,
    ) -> GeocodeCandidate<'a> {
        let record_tokens = place.tokens();
        let matched = self.match_tokens(query_tokens, record_tokens);
        let matched_tokens: Vec<String> = record_tokens
            .iter()
            .zip(&matched)
            .filter(|(_, hit)| **hit)
            .map(|(token, _)| token.clone())
            .collect();

        if normalized == place.normalized_name {
            return GeocodeCandidate {
                place,
                score: 1.0,
                matched_tokens,
            };
        }

        let distinct_record_tokens = record_tokens.iter().collect::<BTreeSet<_>>().len();
        let overlap = matched_tokens.len();
        let union = query_tokens.len() + distinct_record_tokens - overlap;
        let jaccard = if union == 0 {
            0.0
        } else {
            overlap as f64 / union as f64
        };
        let edit = strsim::normalized_levenshtein(normalized, &place.normalized_name);

        let total_weight = self.config.token_weight + self.config.edit_weight;
        let score = if total_weight > 0.0 {
            (self.config.token_weight * jaccard + self.config.edit_weight * edit) / total_weight
        } else {
            edit
        };

        GeocodeCandidate {
            place,
            score: score.clamp(0.0, 1.0),
            matched_tokens,
        }
    }

    /// One-to-one assignment of query tokens onto record tokens. Exact matches
    /// are taken first, then prefix matches of sufficient length. Tokens with
    /// digits (house numbers, unit numbers) only ever match exactly.
    fn match_tokens(&self, query_tokens: &[&str], record_tokens: &[String]) -> Vec<bool> {
        let mut used = vec![false; record_tokens.len()];
        let mut pending = Vec::new();

        for query_token in query_tokens {
            match record_tokens
                .iter()
                .enumerate()
                .position(|(i, r)| !used[i] && r == query_token)
            {
                Some(i) => used[i] = true,
                None => pending.push(*query_token),
            }
        }

        for query_token in pending {
            if query_token.chars().count() < self.config.min_prefix_chars
                || query_token.chars().any(|c| c.is_ascii_digit())
            {
                continue;
            }
            if let Some(i) = record_tokens
                .iter()
                .enumerate()
                .position(|(i, r)| !used[i] && r.starts_with(query_token))
            {
                used[i] = true;
            }
        }

        used
    }
}

fn compare_candidates(a: &GeocodeCandidate<'_>, b: &GeocodeCandidate<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            a.place
                .normalized_name
                .chars()
                .count()
                .cmp(&b.place.normalized_name.chars().count())
        })
        .then_with(|| a.place.id.cmp(&b.place.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::PlaceInput;

    fn store() -> GazetteerStore {
        GazetteerStore::from_records(vec![
            PlaceInput::address("a1", "123 Main St", 40.0, -75.0),
            PlaceInput::address("a2", "456 Oak Ave", 40.01, -75.02),
            PlaceInput::address("a3", "123 Maine St", 40.02, -75.01),
            PlaceInput::address("a4", "789 Pine Rd", 40.03, -75.03),
        ])
        .expect("valid")
    }

    #[test]
    fn exact_match_scores_one() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        let results = resolver.resolve("123 main st.", 5).expect("valid query");
        assert_eq!(results[0].place.id, "a1");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].matched_tokens, vec!["123", "main", "st"]);
    }

    #[test]
    fn typo_still_resolves() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        let results = resolver.resolve("123 Mian St", 3).expect("valid query");
        assert!(!results.is_empty());
        assert!(results[0].place.id == "a1" || results[0].place.id == "a3");
        assert!(results[0].score < 1.0);
    }

    #[test]
    fn prefix_tokens_match() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        let results = resolver.resolve("456 oa av", 1).expect("valid query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].place.id, "a2");
        assert_eq!(results[0].matched_tokens, vec!["456", "oak", "ave"]);
    }

    #[test]
    fn house_numbers_only_match_exactly() {
        let store = GazetteerStore::from_records(vec![
            PlaceInput::address("a1", "123 Main St", 40.0, -75.0),
            PlaceInput::address("a2", "456 Oak Ave", 40.01, -75.02),
        ])
        .expect("valid");
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());

        let results = resolver.resolve("12 Main St", 5).expect("valid query");
        let best = &results[0];
        assert_eq!(best.place.id, "a1");
        assert_eq!(best.matched_tokens, vec!["main", "st"]);
        assert!(best.score < 0.7, "house number mismatch scored {}", best.score);
    }

    #[test]
    fn ordering_is_score_then_length_then_id() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        let results = resolver.resolve("123", 10).expect("valid query");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn respects_max_results() {
        let store = store();
        let config = ScoringConfig {
            min_score: 0.0,
            ..ScoringConfig::default()
        };
        let resolver = GeocodingResolver::new(&store, config);
        assert_eq!(resolver.resolve("123 st", 1).unwrap().len(), 1);
    }

    #[test]
    fn invalid_queries_are_rejected() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        assert!(matches!(resolver.resolve("", 5), Err(Error::InvalidQuery { .. })));
        assert!(matches!(resolver.resolve("   \t", 5), Err(Error::InvalidQuery { .. })));
        assert!(matches!(resolver.resolve("main", 0), Err(Error::InvalidQuery { .. })));
        let long = "a".repeat(257);
        assert!(matches!(resolver.resolve(&long, 5), Err(Error::InvalidQuery { .. })));
    }

    #[test]
    fn punctuation_only_query_has_no_candidates() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        assert!(resolver.resolve("?!,.", 5).expect("valid query").is_empty());
    }

    #[test]
    fn unrelated_query_is_empty_but_ok() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        assert!(resolver.resolve("zzz qqq", 5).expect("valid query").is_empty());
    }

    #[test]
    fn suggestions_use_lower_floor() {
        let store = store();
        let resolver = GeocodingResolver::new(&store, ScoringConfig::default());
        let suggestions = resolver.suggest("789 Pyne Road", 3);
        assert!(suggestions.contains(&"789 Pine Rd".to_string()), "{suggestions:?}");
        assert!(resolver.suggest("", 3).is_empty());
    }
}
