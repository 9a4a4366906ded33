//! Theorem ranking.
//!
//! ```text
//! combined = triangle * triangle_score + specific * specific_score + general * general_helpfulness
//! ```
//!
//! - triangle_score: `sum_t w_t * TheoremTriangle[theorem, t]`
//! - specific_score: `TheoremScore[question, answer, theorem]`, only when both
//!   ids are given
//! - general_helpfulness: corpus-wide share of sessions that found the
//!   theorem helpful
//!
//! Theorems below the threshold are dropped before sorting.

use crate::error::{Result, TutorError};
use crate::knowledge::KnowledgeStore;
use crate::types::{AnswerId, QuestionId, TheoremId, TriangleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Default minimum combined score
pub const DEFAULT_THRESHOLD: f64 = 0.01;

/// Coefficients of the combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub triangle: f64,
    pub specific: f64,
    pub general: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            triangle: 0.7,
            specific: 0.2,
            general: 0.1,
        }
    }
}

/// One ranked theorem with its score components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTheorem {
    pub theorem_id: TheoremId,
    pub combined_score: f64,
    pub text: String,
    pub category: Option<TriangleId>,
    pub triangle_score: f64,
    pub specific_score: f64,
    pub general_helpfulness: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TheoremRanker {
    weights: RankingWeights,
}

impl TheoremRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> RankingWeights {
        self.weights
    }

    /// Rank active theorems against the belief `weights`.
    ///
    /// `question` and `answer` must be given together or not at all.
    pub fn rank(
        &self,
        knowledge: &dyn KnowledgeStore,
        weights: &BTreeMap<TriangleId, f64>,
        question: Option<QuestionId>,
        answer: Option<AnswerId>,
        threshold: f64,
    ) -> Result<Vec<RankedTheorem>> {
        if !threshold.is_finite() {
            return Err(TutorError::InvalidInput(format!(
                "threshold must be finite, got {}",
                threshold
            )));
        }

        let evidence = match (question, answer) {
            (Some(q), Some(a)) => {
                if knowledge.question(q).is_none() {
                    return Err(TutorError::NotFound(format!("question {}", q)));
                }
                if !knowledge.answer_options().iter().any(|opt| opt.id == a) {
                    return Err(TutorError::NotFound(format!("answer {}", a)));
                }
                Some((q, a))
            }
            (None, None) => None,
            _ => {
                return Err(TutorError::InvalidInput(
                    "question and answer must be given together".to_string(),
                ))
            }
        };

        let mut ranked: Vec<RankedTheorem> = knowledge
            .active_theorems()
            .into_iter()
            .map(|theorem| {
                let triangle = triangle_score(knowledge, weights, theorem.id);
                let specific = evidence
                    .map(|(q, a)| knowledge.theorem_score(q, a, theorem.id))
                    .unwrap_or(0.0);
                let combined = self.weights.triangle * triangle
                    + self.weights.specific * specific
                    + self.weights.general * theorem.general_helpfulness;

                RankedTheorem {
                    theorem_id: theorem.id,
                    combined_score: combined,
                    text: theorem.text.clone(),
                    category: theorem.category,
                    triangle_score: triangle,
                    specific_score: specific,
                    general_helpfulness: theorem.general_helpfulness,
                }
            })
            .filter(|r| r.combined_score >= threshold)
            .collect();

        ranked.sort_by(|a, b| {
            b.combined_score
                .total_cmp(&a.combined_score)
                .then(a.theorem_id.cmp(&b.theorem_id))
        });

        debug!(
            "Ranked {} theorems above threshold {}",
            ranked.len(),
            threshold
        );
        Ok(ranked)
    }
}

/// `sum_t w_t * TheoremTriangle[theorem, t]`
pub fn triangle_score(
    knowledge: &dyn KnowledgeStore,
    weights: &BTreeMap<TriangleId, f64>,
    theorem: TheoremId,
) -> f64 {
    weights
        .iter()
        .map(|(&t, &w)| w * knowledge.theorem_triangle_weight(theorem, t))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::test_utils::sample_snapshot;

    fn uniform() -> BTreeMap<TriangleId, f64> {
        (0..4).map(|t| (TriangleId(t), 0.25)).collect()
    }

    fn ids(ranked: &[RankedTheorem]) -> Vec<u32> {
        ranked.iter().map(|r| r.theorem_id.0).collect()
    }

    #[test]
    fn test_rank_without_evidence() {
        let snapshot = sample_snapshot();
        let ranker = TheoremRanker::default();

        let ranked = ranker
            .rank(&snapshot, &uniform(), None, None, DEFAULT_THRESHOLD)
            .unwrap();

        // theorem 1: 0.7 * 0.625 + 0.1 * 0.3 = 0.4675
        // theorem 2: 0.7 * 0.4   + 0.1 * 0.1 = 0.29
        // theorem 4: 0.7 * 0.25  + 0.1 * 0.2 = 0.195
        // theorem 3: 0.7 * 0.25  + 0.1 * 0.05 = 0.18
        // theorem 5 is inactive
        assert_eq!(ids(&ranked), vec![1, 2, 4, 3]);
        assert!((ranked[0].combined_score - 0.4675).abs() < 1e-12);
        assert!(ranked.iter().all(|r| r.specific_score == 0.0));
    }

    #[test]
    fn test_specific_score_applies_with_evidence() {
        let snapshot = sample_snapshot();
        let ranker = TheoremRanker::default();

        let ranked = ranker
            .rank(
                &snapshot,
                &uniform(),
                Some(QuestionId(1)),
                Some(AnswerId(1)),
                DEFAULT_THRESHOLD,
            )
            .unwrap();

        let th2 = ranked.iter().find(|r| r.theorem_id == TheoremId(2)).unwrap();
        assert_eq!(th2.specific_score, 0.5);
        assert!((th2.combined_score - 0.39).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_filters_before_sort() {
        let snapshot = sample_snapshot();
        let ranker = TheoremRanker::default();

        let ranked = ranker.rank(&snapshot, &uniform(), None, None, 0.2).unwrap();
        assert_eq!(ids(&ranked), vec![1, 2]);
        assert!(ranked.iter().all(|r| r.combined_score >= 0.2));
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let snapshot = sample_snapshot();
        let ranker = TheoremRanker::new(RankingWeights {
            triangle: 0.0,
            specific: 0.0,
            general: 0.0,
        });

        let ranked = ranker.rank(&snapshot, &uniform(), None, None, 0.0).unwrap();
        assert_eq!(ids(&ranked), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_arguments() {
        let snapshot = sample_snapshot();
        let ranker = TheoremRanker::default();
        let weights = uniform();

        assert!(matches!(
            ranker.rank(&snapshot, &weights, None, None, f64::NAN),
            Err(TutorError::InvalidInput(_))
        ));
        assert!(matches!(
            ranker.rank(&snapshot, &weights, Some(QuestionId(1)), None, 0.01),
            Err(TutorError::InvalidInput(_))
        ));
        assert!(matches!(
            ranker.rank(&snapshot, &weights, Some(QuestionId(99)), Some(AnswerId(1)), 0.01),
            Err(TutorError::NotFound(_))
        ));
        assert!(matches!(
            ranker.rank(&snapshot, &weights, Some(QuestionId(1)), Some(AnswerId(9)), 0.01),
            Err(TutorError::NotFound(_))
        ));
    }
}
