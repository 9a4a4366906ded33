//! Tutor facade: the operations a calling service drives a session with.
//!
//! Every operation takes the current knowledge snapshot once and works on
//! that snapshot only, so a calibration swap in the middle of a call is
//! never observed.

use crate::config::TutorConfig;
use crate::engine::{
    QuestionSelector, RankedTheorem, RankingWeights, SelectionWeights, TheoremRanker,
    DEFAULT_THRESHOLD,
};
use crate::error::Result;
use crate::knowledge::SharedKnowledge;
use crate::session::{Session, SessionEnd};
use crate::types::{AnswerId, Question, QuestionId, TheoremId, TriangleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Result of submitting an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub weights: BTreeMap<TriangleId, f64>,
    pub ranked: Vec<RankedTheorem>,
}

#[derive(Debug)]
pub struct Tutor {
    knowledge: SharedKnowledge,
    selector: QuestionSelector,
    ranker: TheoremRanker,
    threshold: f64,
}

impl Tutor {
    pub fn new(knowledge: SharedKnowledge) -> Self {
        Self::with_parts(
            knowledge,
            QuestionSelector::new(SelectionWeights::default()),
            TheoremRanker::new(RankingWeights::default()),
            DEFAULT_THRESHOLD,
        )
    }

    pub fn from_config(knowledge: SharedKnowledge, config: &TutorConfig) -> Self {
        Self::with_parts(
            knowledge,
            QuestionSelector::new(config.selection),
            TheoremRanker::new(config.ranking.weights()),
            config.ranking.threshold,
        )
    }

    pub fn with_parts(
        knowledge: SharedKnowledge,
        selector: QuestionSelector,
        ranker: TheoremRanker,
        threshold: f64,
    ) -> Self {
        Self {
            knowledge,
            selector,
            ranker,
            threshold,
        }
    }

    pub fn knowledge(&self) -> &SharedKnowledge {
        &self.knowledge
    }

    pub fn start_session(&self) -> Session {
        let snapshot = self.knowledge.snapshot();
        Session::new(&*snapshot)
    }

    pub fn first_question(&self, session: &mut Session) -> Result<Question> {
        let snapshot = self.knowledge.snapshot();
        session.first_question(&*snapshot, &self.selector)
    }

    pub fn next_question(&self, session: &mut Session) -> Result<Question> {
        let snapshot = self.knowledge.snapshot();
        session.next_question(&*snapshot, &self.selector)
    }

    /// Apply the answer and rank theorems against the updated belief
    pub fn submit_answer(
        &self,
        session: &mut Session,
        question: QuestionId,
        answer: AnswerId,
    ) -> Result<AnswerOutcome> {
        let snapshot = self.knowledge.snapshot();
        let weights = session.apply_answer(&*snapshot, question, answer)?;
        let ranked = self.ranker.rank(
            &*snapshot,
            &weights,
            Some(question),
            Some(answer),
            self.threshold,
        )?;
        debug!(
            "Session {}: {} theorems ranked after question {}",
            session.id(),
            ranked.len(),
            question
        );
        Ok(AnswerOutcome { weights, ranked })
    }

    /// Rank theorems against the session's current belief without changing it.
    /// `threshold` defaults to the configured one.
    pub fn rank_theorems(
        &self,
        session: &Session,
        question: Option<QuestionId>,
        answer: Option<AnswerId>,
        threshold: Option<f64>,
    ) -> Result<Vec<RankedTheorem>> {
        let snapshot = self.knowledge.snapshot();
        self.ranker.rank(
            &*snapshot,
            session.belief().weights(),
            question,
            answer,
            threshold.unwrap_or(self.threshold),
        )
    }

    pub fn end_session(
        &self,
        session: &mut Session,
        feedback: u8,
        triangle_types: Vec<TriangleId>,
        helpful_theorems: Vec<TheoremId>,
        persist: bool,
    ) -> Result<SessionEnd> {
        let snapshot = self.knowledge.snapshot();
        session.end(
            &*snapshot,
            feedback,
            triangle_types,
            helpful_theorems,
            persist,
        )
    }
}
