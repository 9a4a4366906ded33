//! Session lifecycle.
//!
//! A session is `Open` until it ends:
//! - `Closed`: feedback attached, the interaction log is handed out for
//!   persistence
//! - `Abandoned`: the log is dropped
//!
//! Both are terminal. Ending with [`FeedbackCode::ReturnToExercise`] keeps
//! the session open and sets a resume flag instead; the next
//! `next_question` re-issues the question still pending, if any.

pub mod log;
pub mod store;

pub use log::{Interaction, InteractionLog};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};

use crate::engine::{BeliefState, QuestionSelector};
use crate::error::{Result, TutorError};
use crate::knowledge::KnowledgeStore;
use crate::types::{
    AnswerId, FeedbackCode, Question, QuestionId, SessionId, TheoremId, TriangleId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
    Abandoned,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Open => write!(f, "open"),
            SessionState::Closed => write!(f, "closed"),
            SessionState::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Outcome of [`Session::end`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// Session closed; the finished log should be persisted
    Closed(InteractionLog),
    /// Session abandoned; nothing to persist
    Abandoned,
    /// Session stays open and will re-issue the last question
    Resume,
}

/// One learner's session: belief, log and lifecycle state
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    belief: BeliefState,
    log: InteractionLog,
    resume_requested: bool,
    last_issued: Option<QuestionId>,
}

impl Session {
    /// Open a session with a uniform belief over the known categories
    pub fn new(knowledge: &dyn KnowledgeStore) -> Self {
        let id = SessionId::new();
        debug!("Opening session {}", id);
        Self {
            id,
            state: SessionState::Open,
            belief: BeliefState::initialize(knowledge.triangle_categories()),
            log: InteractionLog::new(id),
            resume_requested: false,
            last_issued: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    pub fn resume_requested(&self) -> bool {
        self.resume_requested
    }

    pub fn last_issued(&self) -> Option<QuestionId> {
        self.last_issued
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TutorError::InvalidState(format!(
                "cannot {} on {} session {}",
                operation, self.state, self.id
            )))
        }
    }

    pub fn first_question(
        &mut self,
        knowledge: &dyn KnowledgeStore,
        selector: &QuestionSelector,
    ) -> Result<Question> {
        self.ensure_open("select a question")?;
        let question = selector.first_question(knowledge, &mut self.belief)?;
        self.last_issued = Some(question.id);
        Ok(question)
    }

    /// Next question.
    ///
    /// After a resume request the still-pending question is issued again;
    /// if it was already answered, selection continues as usual.
    pub fn next_question(
        &mut self,
        knowledge: &dyn KnowledgeStore,
        selector: &QuestionSelector,
    ) -> Result<Question> {
        self.ensure_open("select a question")?;

        if self.resume_requested {
            self.resume_requested = false;
            if let Some(pending) = self.belief.pending() {
                let question = knowledge
                    .question(pending)
                    .cloned()
                    .ok_or_else(|| TutorError::NotFound(format!("question {}", pending)))?;
                info!("Session {} resumed at question {}", self.id, pending);
                return Ok(question);
            }
            debug!("Session {} resumed with nothing pending", self.id);
        }

        let question = selector.next_question(knowledge, &mut self.belief)?;
        self.last_issued = Some(question.id);
        Ok(question)
    }

    /// Apply an answer to the pending question and record it
    pub fn apply_answer(
        &mut self,
        knowledge: &dyn KnowledgeStore,
        question: QuestionId,
        answer: AnswerId,
    ) -> Result<BTreeMap<TriangleId, f64>> {
        self.ensure_open("apply an answer")?;
        let weights = self.belief.apply_answer(knowledge, question, answer)?;
        self.log.record(question, answer);
        Ok(weights)
    }

    /// End the session.
    ///
    /// Invalid feedback codes or unknown triangle/theorem ids fail with
    /// `InvalidInput` and leave the session untouched.
    /// Triangle types and helpful theorems are stored sorted and without
    /// duplicates.
    pub fn end(
        &mut self,
        knowledge: &dyn KnowledgeStore,
        feedback: u8,
        mut triangle_types: Vec<TriangleId>,
        mut helpful_theorems: Vec<TheoremId>,
        persist: bool,
    ) -> Result<SessionEnd> {
        self.ensure_open("end")?;
        let feedback = FeedbackCode::try_from(feedback)?;

        let known_triangles = knowledge.triangle_categories();
        if let Some(t) = triangle_types
            .iter()
            .find(|t| !known_triangles.iter().any(|c| c.id == **t))
        {
            return Err(TutorError::InvalidInput(format!("unknown triangle type {}", t)));
        }
        if let Some(th) = helpful_theorems
            .iter()
            .find(|th| knowledge.theorem(**th).is_none())
        {
            return Err(TutorError::InvalidInput(format!("unknown theorem {}", th)));
        }

        if !feedback.is_terminal() {
            self.resume_requested = true;
            info!("Session {} will resume at the last question", self.id);
            return Ok(SessionEnd::Resume);
        }

        if !persist {
            self.abandon()?;
            return Ok(SessionEnd::Abandoned);
        }

        triangle_types.sort();
        triangle_types.dedup();
        helpful_theorems.sort();
        helpful_theorems.dedup();
        self.log.finalize(feedback, triangle_types, helpful_theorems);
        self.state = SessionState::Closed;
        info!(
            "Session {} closed with feedback {} after {} interactions",
            self.id,
            feedback,
            self.log.len()
        );
        Ok(SessionEnd::Closed(self.log.clone()))
    }

    /// Drop the session without persisting anything
    pub fn abandon(&mut self) -> Result<()> {
        self.ensure_open("abandon")?;
        self.state = SessionState::Abandoned;
        self.log.interactions.clear();
        info!("Session {} abandoned", self.id);
        Ok(())
    }
}
