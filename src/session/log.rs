//! Interaction log: the persisted record of a finished session.

use crate::types::{AnswerId, FeedbackCode, QuestionId, SessionId, TheoremId, TriangleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
    pub answered_at: DateTime<Utc>,
}

/// Append-only record of a session.
///
/// While the session is open only `interactions` grows; feedback, triangle
/// types and helpful theorems are attached when it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    pub session_id: SessionId,
    pub interactions: Vec<Interaction>,
    pub feedback: Option<FeedbackCode>,
    #[serde(default)]
    pub triangle_types: Vec<TriangleId>,
    #[serde(default)]
    pub helpful_theorems: Vec<TheoremId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl InteractionLog {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            interactions: Vec::new(),
            feedback: None,
            triangle_types: Vec::new(),
            helpful_theorems: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn record(&mut self, question_id: QuestionId, answer_id: AnswerId) {
        self.interactions.push(Interaction {
            question_id,
            answer_id,
            answered_at: Utc::now(),
        });
    }

    /// Attach the closing data
    pub fn finalize(
        &mut self,
        feedback: FeedbackCode,
        triangle_types: Vec<TriangleId>,
        helpful_theorems: Vec<TheoremId>,
    ) {
        self.feedback = Some(feedback);
        self.triangle_types = triangle_types;
        self.helpful_theorems = helpful_theorems;
        self.ended_at = Some(Utc::now());
    }

    /// (question, answer) pairs in the order they were answered
    pub fn pairs(&self) -> impl Iterator<Item = (QuestionId, AnswerId)> + '_ {
        self.interactions
            .iter()
            .map(|i| (i.question_id, i.answer_id))
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_order() {
        let mut log = InteractionLog::new(SessionId::new());
        log.record(QuestionId(3), AnswerId(1));
        log.record(QuestionId(1), AnswerId(0));

        let pairs: Vec<_> = log.pairs().collect();
        assert_eq!(
            pairs,
            vec![(QuestionId(3), AnswerId(1)), (QuestionId(1), AnswerId(0))]
        );
        assert_eq!(log.feedback, None);
    }

    #[test]
    fn test_json_shape() {
        let mut log = InteractionLog::new(SessionId::new());
        log.record(QuestionId(1), AnswerId(1));
        log.finalize(FeedbackCode::Succeeded, vec![TriangleId(2)], vec![TheoremId(4)]);

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["feedback"], 5);
        assert_eq!(value["triangle_types"], serde_json::json!([2]));
        assert_eq!(value["interactions"][0]["question_id"], 1);

        let back: InteractionLog = serde_json::from_value(value).unwrap();
        assert_eq!(back, log);
    }
}
