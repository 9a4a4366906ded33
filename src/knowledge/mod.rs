//! Knowledge Store: read-only reference data consumed by the engine.
//!
//! The engine only talks to the [`KnowledgeStore`] trait. The in-memory
//! [`KnowledgeSnapshot`] implements it; [`SharedKnowledge`] publishes the
//! current snapshot to many concurrent sessions and lets calibration replace
//! it atomically.

pub mod schema;
pub mod seed;
pub mod snapshot;
pub mod sqlite;
#[cfg(test)]
pub mod test_utils;

pub use seed::KnowledgeSeed;
pub use snapshot::{
    KnowledgeSnapshot, MultiplierKey, MultiplierTable, MultiplierTier, SnapshotBuilder,
    TheoremScoreKey, NEUTRAL_MULTIPLIER,
};
pub use sqlite::SqliteKnowledgeSource;

use crate::types::{
    AnswerId, AnswerOption, Question, QuestionId, Theorem, TheoremId, TriangleCategory, TriangleId,
};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Read access to reference data
pub trait KnowledgeStore: Send + Sync {
    /// All triangle categories, ascending by id
    fn triangle_categories(&self) -> &[TriangleCategory];

    /// All answer options, ascending by id
    fn answer_options(&self) -> &[AnswerOption];

    /// Active questions, ascending by id
    fn active_questions(&self) -> Vec<&Question>;

    fn question(&self, id: QuestionId) -> Option<&Question>;

    /// Questions that must be asked before `id` becomes eligible
    fn prerequisites(&self, id: QuestionId) -> BTreeSet<QuestionId>;

    /// Tiered multiplier lookup (Dynamic, then Initial, then 1.0)
    fn multiplier(&self, question: QuestionId, answer: AnswerId, triangle: TriangleId) -> f64;

    /// Compatibility weight of a theorem with a triangle category (0 if none)
    fn theorem_triangle_weight(&self, theorem: TheoremId, triangle: TriangleId) -> f64;

    /// Answer-specific correlation of a theorem (0 if none)
    fn theorem_score(&self, question: QuestionId, answer: AnswerId, theorem: TheoremId) -> f64;

    /// Active theorems, ascending by id
    fn active_theorems(&self) -> Vec<&Theorem>;

    fn theorem(&self, id: TheoremId) -> Option<&Theorem>;

    fn related_theorem(&self, question: QuestionId) -> Option<TheoremId> {
        self.question(question).and_then(|q| q.related_theorem)
    }
}

/// Current knowledge snapshot shared by all sessions.
///
/// Readers take an `Arc` of the snapshot once per operation; a swap never
/// mutates a snapshot that is already handed out.
#[derive(Debug, Clone)]
pub struct SharedKnowledge {
    inner: Arc<RwLock<Arc<KnowledgeSnapshot>>>,
}

impl SharedKnowledge {
    pub fn new(snapshot: KnowledgeSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot currently in effect
    pub fn snapshot(&self) -> Arc<KnowledgeSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Publish a new snapshot, returning the previous one
    pub fn swap(&self, snapshot: KnowledgeSnapshot) -> Arc<KnowledgeSnapshot> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(snapshot));
        info!("Knowledge snapshot swapped");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::test_utils::sample_snapshot;

    #[test]
    fn test_swap_does_not_touch_handed_out_snapshot() {
        let shared = SharedKnowledge::new(sample_snapshot());
        let before = shared.snapshot();
        let key = (QuestionId(1), AnswerId(1), TriangleId(2));
        assert_eq!(before.multipliers().resolve(&key), 2.0);

        let mut dynamic = before.multipliers().dynamic().clone();
        dynamic.insert(key, 3.0);
        let next = before.with_dynamic_multipliers(dynamic).unwrap();
        let previous = shared.swap(next);

        assert!(Arc::ptr_eq(&previous, &before));
        assert_eq!(before.multipliers().resolve(&key), 2.0);
        assert_eq!(shared.snapshot().multipliers().resolve(&key), 3.0);
    }

    #[test]
    fn test_related_theorem_default_method() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.related_theorem(QuestionId(2)), Some(TheoremId(2)));
        assert_eq!(snapshot.related_theorem(QuestionId(404)), None);
    }
}
