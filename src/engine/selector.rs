//! Question selection.
//!
//! # Opening question
//!
//! The lowest-difficulty eligible question, ties by ascending id.
//!
//! # Next question
//!
//! Every eligible question is scored as
//!
//! ```text
//! score = information_gain_weight * gain + relevance_weight * relevance
//! ```
//!
//! - gain: expected reduction in belief entropy, from a [`GainEstimator`]
//! - relevance: triangle-weighted score of the question's related theorem
//!
//! The maximum wins; scores within 1e-12 are tied and go to the lowest id.
//!
//! A question is eligible when it is active, not yet asked, and all of its
//! prerequisites have been asked.

use super::belief::{entropy, BeliefState};
use super::ranker::triangle_score;
use crate::error::{Result, TutorError};
use crate::knowledge::KnowledgeStore;
use crate::types::{Question, QuestionId, TriangleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

/// Scores within this distance are considered equal
pub const SCORE_TIE_EPSILON: f64 = 1e-12;

/// Estimates how much asking a question would reduce uncertainty
pub trait GainEstimator: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn gain(
        &self,
        knowledge: &dyn KnowledgeStore,
        weights: &BTreeMap<TriangleId, f64>,
        question: QuestionId,
    ) -> f64;
}

/// Expected entropy reduction over all answer options.
///
/// For each answer `a`, `u_t = w_t * m(q, a, t)` and `Z_a = sum(u)`. The
/// answer probability is `Z_a / sum_b(Z_b)` and the posterior is `u / Z_a`.
/// Gain is `H(w) - sum_a P(a) * H(posterior_a)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropyGain;

impl GainEstimator for EntropyGain {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn gain(
        &self,
        knowledge: &dyn KnowledgeStore,
        weights: &BTreeMap<TriangleId, f64>,
        question: QuestionId,
    ) -> f64 {
        let mut outcomes: Vec<(f64, f64)> = Vec::new();
        for answer in knowledge.answer_options() {
            let unnormalized: Vec<f64> = weights
                .iter()
                .map(|(&t, &w)| w * knowledge.multiplier(question, answer.id, t))
                .collect();
            let z: f64 = unnormalized.iter().sum();
            if !z.is_finite() || z <= SCORE_TIE_EPSILON {
                continue;
            }
            let posterior_entropy = entropy(unnormalized.iter().map(|u| u / z));
            outcomes.push((z, posterior_entropy));
        }

        let total: f64 = outcomes.iter().map(|(z, _)| z).sum();
        if total <= 0.0 {
            return 0.0;
        }

        let expected: f64 = outcomes.iter().map(|(z, h)| (z / total) * h).sum();
        entropy(weights.values().copied()) - expected
    }
}

/// Coefficients of the next-question score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    pub information_gain: f64,
    pub relevance: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            information_gain: 1.0,
            relevance: 1.0,
        }
    }
}

/// Score breakdown for one candidate question
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionScore {
    pub question_id: QuestionId,
    pub gain: f64,
    pub relevance: f64,
    pub total: f64,
}

#[derive(Debug)]
pub struct QuestionSelector {
    weights: SelectionWeights,
    estimator: Box<dyn GainEstimator>,
}

impl Default for QuestionSelector {
    fn default() -> Self {
        Self::new(SelectionWeights::default())
    }
}

impl QuestionSelector {
    pub fn new(weights: SelectionWeights) -> Self {
        Self::with_estimator(weights, Box::new(EntropyGain))
    }

    pub fn with_estimator(weights: SelectionWeights, estimator: Box<dyn GainEstimator>) -> Self {
        Self { weights, estimator }
    }

    pub fn weights(&self) -> SelectionWeights {
        self.weights
    }

    /// Active, unasked questions whose prerequisites are all asked,
    /// ascending by id
    pub fn candidates<'k>(
        &self,
        knowledge: &'k dyn KnowledgeStore,
        belief: &BeliefState,
    ) -> Vec<&'k Question> {
        knowledge
            .active_questions()
            .into_iter()
            .filter(|q| !belief.has_asked(q.id))
            .filter(|q| {
                knowledge
                    .prerequisites(q.id)
                    .iter()
                    .all(|required| belief.has_asked(*required))
            })
            .collect()
    }

    /// Opening question; marks it pending
    pub fn first_question(
        &self,
        knowledge: &dyn KnowledgeStore,
        belief: &mut BeliefState,
    ) -> Result<Question> {
        if let Some(pending) = reissue_pending(knowledge, belief) {
            return Ok(pending);
        }

        let chosen = self
            .candidates(knowledge, belief)
            .into_iter()
            .min_by_key(|q| (q.difficulty, q.id))
            .cloned()
            .ok_or_else(|| TutorError::NotFound("no eligible opening question".to_string()))?;

        debug!(
            "Opening question {} (difficulty {})",
            chosen.id, chosen.difficulty
        );
        belief.set_pending(chosen.id);
        Ok(chosen)
    }

    /// Highest-scoring eligible question; marks it pending.
    ///
    /// Fails with `SessionExhausted` when nothing is eligible.
    pub fn next_question(
        &self,
        knowledge: &dyn KnowledgeStore,
        belief: &mut BeliefState,
    ) -> Result<Question> {
        if let Some(pending) = reissue_pending(knowledge, belief) {
            return Ok(pending);
        }

        let mut best: Option<(QuestionScore, &Question)> = None;
        for question in self.candidates(knowledge, belief) {
            let score = self.score(knowledge, belief.weights(), question);
            // Candidates arrive in ascending id order, so only a strictly
            // better score replaces the current best.
            let better = match &best {
                None => true,
                Some((current, _)) => score.total > current.total + SCORE_TIE_EPSILON,
            };
            if better {
                best = Some((score, question));
            }
        }

        let (score, question) = best.ok_or(TutorError::SessionExhausted)?;
        debug!(
            "Selected question {} (gain {:.4}, relevance {:.4}, total {:.4}, estimator {})",
            question.id,
            score.gain,
            score.relevance,
            score.total,
            self.estimator.name()
        );

        let question = question.clone();
        belief.set_pending(question.id);
        Ok(question)
    }

    pub fn score(
        &self,
        knowledge: &dyn KnowledgeStore,
        weights: &BTreeMap<TriangleId, f64>,
        question: &Question,
    ) -> QuestionScore {
        let gain = self.estimator.gain(knowledge, weights, question.id);
        let relevance = relevance(knowledge, weights, question);
        QuestionScore {
            question_id: question.id,
            gain,
            relevance,
            total: self.weights.information_gain * gain + self.weights.relevance * relevance,
        }
    }
}

/// Triangle-weighted score of the question's related theorem; 0 without one
pub fn relevance(
    knowledge: &dyn KnowledgeStore,
    weights: &BTreeMap<TriangleId, f64>,
    question: &Question,
) -> f64 {
    question
        .related_theorem
        .map(|theorem| triangle_score(knowledge, weights, theorem))
        .unwrap_or(0.0)
}

fn reissue_pending(knowledge: &dyn KnowledgeStore, belief: &BeliefState) -> Option<Question> {
    let pending = belief.pending()?;
    debug!("Re-issuing pending question {}", pending);
    knowledge.question(pending).cloned()
}
