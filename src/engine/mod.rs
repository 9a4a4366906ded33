//! Adaptive engine: belief updates, question selection and theorem ranking.
//!
//! Everything here is synchronous and works on an explicitly passed
//! [`BeliefState`] plus a [`crate::knowledge::KnowledgeStore`].

pub mod belief;
pub mod ranker;
pub mod selector;

pub use belief::{BeliefState, COLLAPSE_EPSILON};
pub use ranker::{RankedTheorem, RankingWeights, TheoremRanker, DEFAULT_THRESHOLD};
pub use selector::{
    EntropyGain, GainEstimator, QuestionScore, QuestionSelector, SelectionWeights,
};
