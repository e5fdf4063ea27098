//! Matching engine: scores a query against every index row
//!
//! Every call rescans the full index; there is no caching and no early
//! termination. That keeps results independent of call history but makes
//! each query O(rows), which is fine for a catalog of a few hundred phrasings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatchingConfig;
use crate::error::Result;

use super::{normalize, IndexRow, MatchIndex, ScoreSet};

/// Outcome of [`MatchingEngine::find_best_match`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        answer: String,
        confidence: f64,
        category: String,
    },
    /// Nothing cleared the threshold; `confidence` is the best score seen
    NoMatch { confidence: f64 },
}

impl MatchResult {
    pub fn confidence(&self) -> f64 {
        match self {
            MatchResult::Matched { confidence, .. } | MatchResult::NoMatch { confidence } => {
                *confidence
            }
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }
}

/// One ranked row from [`MatchingEngine::find_top_matches`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMatch {
    /// Catalog phrase as written
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub category: String,
    /// Per-metric breakdown behind `score`
    pub scores: ScoreSet,
}

/// Finds the best catalog rows for free-text queries
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    index: MatchIndex,
    config: MatchingConfig,
}

impl MatchingEngine {
    /// Build an engine, rejecting invalid weights or thresholds up front
    pub fn new(index: MatchIndex, config: MatchingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    pub fn index(&self) -> &MatchIndex {
        &self.index
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    fn score_row(&self, normalized_query: &str, row: &IndexRow) -> (ScoreSet, f64) {
        let scores = ScoreSet::compute(normalized_query, &row.normalized);
        let weighted = scores.weighted(&self.config.weights);
        (scores, weighted)
    }

    /// Per-metric scores of `query` against one row; `None` when `position` is
    /// past the end of the index
    pub fn score_breakdown(&self, query: &str, position: usize) -> Option<ScoreSet> {
        let row = self.index.get(position)?;
        Some(ScoreSet::compute(&normalize(query), &row.normalized))
    }

    /// Best row for `query`, accepted only when it reaches the threshold.
    ///
    /// Ties keep the first row in index order.
    pub fn find_best_match(&self, query: &str) -> MatchResult {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return MatchResult::NoMatch { confidence: 0.0 };
        }

        let mut best_score = 0.0_f64;
        let mut best_row: Option<&IndexRow> = None;

        for row in self.index.rows() {
            let (_, score) = self.score_row(&normalized, row);
            if score > best_score {
                best_score = score;
                best_row = Some(row);
            }
        }

        debug!(
            query = %normalized,
            best_score,
            best_phrase = best_row.map(|r| r.normalized.as_str()).unwrap_or(""),
            "best match"
        );

        match best_row {
            Some(row) if best_score >= self.config.threshold => MatchResult::Matched {
                answer: row.answer.to_string(),
                confidence: best_score,
                category: row.category.to_string(),
            },
            _ => MatchResult::NoMatch {
                confidence: best_score,
            },
        }
    }

    /// The `top_n` highest-scoring rows, best first, ties in index order.
    ///
    /// No threshold is applied.
    pub fn find_top_matches(&self, query: &str, top_n: usize) -> Vec<TopMatch> {
        let normalized = normalize(query);
        if normalized.is_empty() || top_n == 0 {
            return vec![];
        }

        let mut scored: Vec<(&IndexRow, ScoreSet, f64)> = self
            .index
            .rows()
            .iter()
            .map(|row| {
                let (scores, weighted) = self.score_row(&normalized, row);
                (row, scores, weighted)
            })
            .collect();

        // sort_by is stable, so equal scores stay in index order
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));

        scored
            .into_iter()
            .take(top_n)
            .map(|(row, scores, score)| TopMatch {
                question: row.original.clone(),
                answer: row.answer.to_string(),
                score,
                category: row.category.to_string(),
                scores,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::error::HrBotError;

    fn engine(threshold: f64) -> MatchingEngine {
        let entries = vec![
            CatalogEntry::new("cuti tahunan berapa hari", "12 hari", "cuti"),
            CatalogEntry::new("Kapan gaji bulanan cair?", "Tanggal 25", "gaji")
                .with_variants(["tanggal gajian", "slip gaji dimana"]),
        ];
        MatchingEngine::new(
            MatchIndex::build(&entries),
            MatchingConfig::with_threshold(threshold),
        )
        .unwrap()
    }

    #[test]
    fn test_reordered_query_matches() {
        let result = engine(65.0).find_best_match("berapa hari cuti tahunan");
        match result {
            MatchResult::Matched {
                answer,
                confidence,
                category,
            } => {
                assert_eq!(answer, "12 hari");
                assert_eq!(category, "cuti");
                assert!(confidence >= 65.0);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_verbatim_canonical_question_self_matches() {
        let result = engine(65.0).find_best_match("Kapan gaji bulanan cair?");
        assert!(result.is_match());
        assert!((result.confidence() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_query_is_no_match() {
        assert_eq!(
            engine(65.0).find_best_match("?!"),
            MatchResult::NoMatch { confidence: 0.0 }
        );
        assert_eq!(
            engine(65.0).find_best_match(""),
            MatchResult::NoMatch { confidence: 0.0 }
        );
    }

    #[test]
    fn test_below_threshold_reports_best_score() {
        let engine = engine(99.0);
        let result = engine.find_best_match("tanggal gaji");
        assert!(!result.is_match());
        assert!(result.confidence() > 0.0);
        assert!(result.confidence() < 99.0);
    }

    #[test]
    fn test_ties_keep_first_row() {
        let entries = vec![
            CatalogEntry::new("jadwal shuttle", "A", "fasilitas"),
            CatalogEntry::new("jadwal shuttle", "B", "fasilitas"),
        ];
        let engine =
            MatchingEngine::new(MatchIndex::build(&entries), MatchingConfig::default()).unwrap();

        match engine.find_best_match("jadwal shuttle") {
            MatchResult::Matched { answer, .. } => assert_eq!(answer, "A"),
            other => panic!("expected match, got {:?}", other),
        }

        let top = engine.find_top_matches("jadwal shuttle", 2);
        assert_eq!(top[0].answer, "A");
        assert_eq!(top[1].answer, "B");
    }

    #[test]
    fn test_top_matches_sorted_and_truncated() {
        let engine = engine(65.0);
        let top = engine.find_top_matches("gaji", 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].score >= top[1].score);

        let all = engine.find_top_matches("gaji", 10);
        assert_eq!(all.len(), engine.index().size());
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

        assert!(engine.find_top_matches("gaji", 0).is_empty());
        assert!(engine.find_top_matches("   ", 3).is_empty());
    }

    #[test]
    fn test_top_matches_expose_original_phrase() {
        let top = engine(65.0).find_top_matches("kapan gaji bulanan cair", 1);
        assert_eq!(top[0].question, "Kapan gaji bulanan cair?");
        assert_eq!(top[0].scores.exact, 100.0);
    }

    #[test]
    fn test_score_breakdown_matches_top_match() {
        let engine = engine(65.0);
        let top = engine.find_top_matches("Tanggal gajian!", 1);

        let breakdown = engine.score_breakdown("Tanggal gajian!", 2).unwrap();
        assert_eq!(engine.index().get(2).unwrap().original, "tanggal gajian");
        assert_eq!(breakdown, top[0].scores);
        assert_eq!(breakdown.exact, 100.0);

        assert!(engine.score_breakdown("gaji", engine.index().size()).is_none());
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let result = MatchingEngine::new(MatchIndex::default(), MatchingConfig::with_threshold(120.0));
        assert!(matches!(result, Err(HrBotError::Config(_))));
    }

    #[test]
    fn test_empty_index_never_matches() {
        let engine = MatchingEngine::new(MatchIndex::default(), MatchingConfig::default()).unwrap();
        assert_eq!(
            engine.find_best_match("cuti"),
            MatchResult::NoMatch { confidence: 0.0 }
        );
        assert!(engine.find_top_matches("cuti", 3).is_empty());
    }
}
