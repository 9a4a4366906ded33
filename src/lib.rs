//! geotutor - Adaptive Geometry Theorem Tutor
//!
//! An engine that, per learning session, estimates which triangle category a
//! learner is working on, picks the next question by information gain and
//! relevance while respecting prerequisites, and ranks theorems against the
//! current evidence.
//!
//! # Architecture
//!
//! The crate is organized in layers:
//! - **Types**: ids, knowledge records, feedback codes
//! - **Knowledge**: the read-only [`KnowledgeStore`] and its SQLite source
//! - **Engine**: belief state, question selection and theorem ranking
//! - **Session**: lifecycle, interaction log and session stores
//! - **Calibration**: offline jobs that learn from stored sessions
//!
//! # Example
//!
//! ```ignore
//! use geotutor_core::{KnowledgeSnapshot, SharedKnowledge, Tutor, AnswerId};
//!
//! let tutor = Tutor::new(SharedKnowledge::new(snapshot));
//! let mut session = tutor.start_session();
//!
//! let question = tutor.first_question(&mut session)?;
//! let outcome = tutor.submit_answer(&mut session, question.id, AnswerId(1))?;
//! for theorem in &outcome.ranked {
//!     println!("{:.3} {}", theorem.combined_score, theorem.text);
//! }
//! let next = tutor.next_question(&mut session)?;
//! ```

pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;
pub mod tutor;
pub mod types;

// Re-export commonly used types
pub use calibration::{default_jobs, run_calibration, CalibrationJob, CalibrationReport};
pub use config::TutorConfig;
pub use engine::{BeliefState, QuestionSelector, RankedTheorem, TheoremRanker};
pub use error::{Result, TutorError};
pub use knowledge::{
    KnowledgeSeed, KnowledgeSnapshot, KnowledgeStore, SharedKnowledge, SqliteKnowledgeSource,
};
pub use service::TutorService;
pub use session::{
    InteractionLog, MemorySessionStore, Session, SessionEnd, SessionState, SessionStore,
    SqliteSessionStore,
};
pub use stats::SessionStats;
pub use tutor::{AnswerOutcome, Tutor};
pub use types::{
    AnswerId, FeedbackCode, Question, QuestionId, SessionId, Theorem, TheoremId, TriangleCategory,
    TriangleId,
};
