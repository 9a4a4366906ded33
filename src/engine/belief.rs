//! Belief state over triangle categories and the answer processor.
//!
//! The belief is a probability distribution over triangle categories. Each
//! answer multiplies every category weight by its tiered multiplier and
//! renormalizes, so weights stay non-negative and sum to 1.

use crate::error::{Result, TutorError};
use crate::knowledge::KnowledgeStore;
use crate::types::{AnswerId, QuestionId, TriangleCategory, TriangleId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Normalizers at or below this are treated as a collapsed distribution
pub const COLLAPSE_EPSILON: f64 = 1e-12;

/// Per-session belief, asked set and pending question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    weights: BTreeMap<TriangleId, f64>,
    asked: BTreeSet<QuestionId>,
    pending: Option<QuestionId>,
}

impl BeliefState {
    /// Uniform belief over `categories`, nothing asked yet
    pub fn initialize(categories: &[TriangleCategory]) -> Self {
        Self {
            weights: uniform(categories.iter().map(|c| c.id)),
            asked: BTreeSet::new(),
            pending: None,
        }
    }

    pub fn weights(&self) -> &BTreeMap<TriangleId, f64> {
        &self.weights
    }

    pub fn weight(&self, triangle: TriangleId) -> f64 {
        self.weights.get(&triangle).copied().unwrap_or(0.0)
    }

    pub fn asked(&self) -> &BTreeSet<QuestionId> {
        &self.asked
    }

    pub fn has_asked(&self, question: QuestionId) -> bool {
        self.asked.contains(&question)
    }

    /// The most recently issued, not yet answered question
    pub fn pending(&self) -> Option<QuestionId> {
        self.pending
    }

    pub(crate) fn set_pending(&mut self, question: QuestionId) {
        self.pending = Some(question);
    }

    /// Apply an answer to the pending question.
    ///
    /// Returns the updated weights. Fails with `NotFound` for unknown ids and
    /// `OutOfOrder` when `question` is not the pending question; in both
    /// cases the belief is unchanged.
    pub fn apply_answer(
        &mut self,
        knowledge: &dyn KnowledgeStore,
        question: QuestionId,
        answer: AnswerId,
    ) -> Result<BTreeMap<TriangleId, f64>> {
        if knowledge.question(question).is_none() {
            return Err(TutorError::NotFound(format!("question {}", question)));
        }
        if !knowledge.answer_options().iter().any(|a| a.id == answer) {
            return Err(TutorError::NotFound(format!("answer {}", answer)));
        }
        if self.pending != Some(question) {
            return Err(TutorError::OutOfOrder {
                expected: self.pending,
                got: question,
            });
        }

        self.weights = posterior(knowledge, &self.weights, question, answer).unwrap_or_else(|| {
            warn!(
                "Belief collapsed after question {} answer {}; resetting to uniform",
                question, answer
            );
            uniform(self.weights.keys().copied())
        });

        self.asked.insert(question);
        self.pending = None;

        debug!(
            "Applied answer {} to question {}: {:?}",
            answer, question, self.weights
        );
        Ok(self.weights.clone())
    }

    /// Shannon entropy of the belief, in bits
    pub fn entropy(&self) -> f64 {
        entropy(self.weights.values().copied())
    }

    /// Highest-weighted category; ties go to the lowest id
    pub fn most_likely(&self) -> Option<(TriangleId, f64)> {
        self.weights
            .iter()
            .fold(None, |best: Option<(TriangleId, f64)>, (&id, &w)| match best {
                Some((_, best_w)) if best_w >= w => best,
                _ => Some((id, w)),
            })
    }
}

/// Multiply `weights` by the tiered multipliers for (question, answer) and
/// renormalize. `None` if the normalizer collapses.
pub fn posterior(
    knowledge: &dyn KnowledgeStore,
    weights: &BTreeMap<TriangleId, f64>,
    question: QuestionId,
    answer: AnswerId,
) -> Option<BTreeMap<TriangleId, f64>> {
    let unnormalized: BTreeMap<TriangleId, f64> = weights
        .iter()
        .map(|(&t, &w)| (t, w * knowledge.multiplier(question, answer, t)))
        .collect();
    normalize(unnormalized)
}

/// Scale weights to sum to 1. `None` if the sum is non-finite or ≤ 1e-12.
pub fn normalize(mut weights: BTreeMap<TriangleId, f64>) -> Option<BTreeMap<TriangleId, f64>> {
    let total: f64 = weights.values().sum();
    if !total.is_finite() || total <= COLLAPSE_EPSILON {
        return None;
    }
    for w in weights.values_mut() {
        *w /= total;
    }
    Some(weights)
}

/// Base-2 entropy; zero weights contribute nothing
pub fn entropy(weights: impl IntoIterator<Item = f64>) -> f64 {
    weights
        .into_iter()
        .filter(|w| *w > 0.0)
        .map(|w| -w * w.log2())
        .sum()
}

fn uniform(ids: impl Iterator<Item = TriangleId>) -> BTreeMap<TriangleId, f64> {
    let ids: Vec<TriangleId> = ids.collect();
    let share = 1.0 / ids.len().max(1) as f64;
    ids.into_iter().map(|id| (id, share)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::test_utils::{question, sample_snapshot};
    use crate::knowledge::KnowledgeSnapshot;

    fn pending_on(snapshot: &KnowledgeSnapshot, q: u32) -> BeliefState {
        let mut belief = BeliefState::initialize(snapshot.triangle_categories());
        belief.set_pending(QuestionId(q));
        belief
    }

    #[test]
    fn test_initialize_is_uniform() {
        let snapshot = sample_snapshot();
        let belief = BeliefState::initialize(snapshot.triangle_categories());

        assert_eq!(belief.weights().len(), 4);
        for w in belief.weights().values() {
            assert_eq!(*w, 0.25);
        }
        assert!(belief.asked().is_empty());
        assert_eq!(belief.pending(), None);
        assert!((belief.entropy() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dynamic_multiplier_shifts_weight() {
        let snapshot = sample_snapshot();
        let mut belief = pending_on(&snapshot, 1);

        let weights = belief
            .apply_answer(&snapshot, QuestionId(1), AnswerId(1))
            .unwrap();

        assert!((weights[&TriangleId(2)] - 0.4).abs() < 1e-12);
        assert!((weights[&TriangleId(0)] - 0.2).abs() < 1e-12);
        assert_eq!(belief.most_likely().map(|(t, _)| t), Some(TriangleId(2)));
        assert!(belief.has_asked(QuestionId(1)));
        assert_eq!(belief.pending(), None);
    }

    #[test]
    fn test_answer_for_other_question_is_out_of_order() {
        let snapshot = sample_snapshot();
        let mut belief = pending_on(&snapshot, 1);
        let before = belief.clone();

        let err = belief
            .apply_answer(&snapshot, QuestionId(2), AnswerId(1))
            .unwrap_err();

        assert!(matches!(
            err,
            TutorError::OutOfOrder {
                expected: Some(QuestionId(1)),
                got: QuestionId(2)
            }
        ));
        assert_eq!(belief, before);
    }

    #[test]
    fn test_answer_without_pending_question_is_out_of_order() {
        let snapshot = sample_snapshot();
        let mut belief = BeliefState::initialize(snapshot.triangle_categories());

        let err = belief
            .apply_answer(&snapshot, QuestionId(1), AnswerId(1))
            .unwrap_err();
        assert!(matches!(err, TutorError::OutOfOrder { expected: None, .. }));
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let snapshot = sample_snapshot();
        let mut belief = pending_on(&snapshot, 1);

        assert!(matches!(
            belief.apply_answer(&snapshot, QuestionId(99), AnswerId(1)),
            Err(TutorError::NotFound(_))
        ));
        assert!(matches!(
            belief.apply_answer(&snapshot, QuestionId(1), AnswerId(42)),
            Err(TutorError::NotFound(_))
        ));
        assert_eq!(belief.pending(), Some(QuestionId(1)));
    }

    #[test]
    fn test_collapse_resets_to_uniform() {
        let snapshot = KnowledgeSnapshot::builder()
            .default_triangles()
            .default_answers()
            .question(question(1, 1))
            .initial_multiplier(1, 0, 0, 0.0)
            .initial_multiplier(1, 0, 1, 0.0)
            .initial_multiplier(1, 0, 2, 0.0)
            .initial_multiplier(1, 0, 3, 0.0)
            .build()
            .unwrap();
        let mut belief = pending_on(&snapshot, 1);

        let weights = belief
            .apply_answer(&snapshot, QuestionId(1), AnswerId(0))
            .unwrap();

        for w in weights.values() {
            assert_eq!(*w, 0.25);
        }
        assert!(belief.has_asked(QuestionId(1)));
    }

    #[test]
    fn test_zero_multiplier_eliminates_category() {
        let snapshot = KnowledgeSnapshot::builder()
            .default_triangles()
            .default_answers()
            .question(question(1, 1))
            .initial_multiplier(1, 0, 3, 0.0)
            .build()
            .unwrap();
        let mut belief = pending_on(&snapshot, 1);

        let weights = belief
            .apply_answer(&snapshot, QuestionId(1), AnswerId(0))
            .unwrap();

        assert_eq!(weights[&TriangleId(3)], 0.0);
        assert!((weights.values().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_most_likely_ties_go_to_lowest_id() {
        let snapshot = sample_snapshot();
        let belief = BeliefState::initialize(snapshot.triangle_categories());
        assert_eq!(belief.most_likely(), Some((TriangleId(0), 0.25)));
    }

    #[test]
    fn test_entropy_of_point_mass_is_zero() {
        assert_eq!(entropy([1.0, 0.0, 0.0]), 0.0);
        assert!((entropy([0.5, 0.5]) - 1.0).abs() < 1e-12);
    }
}
