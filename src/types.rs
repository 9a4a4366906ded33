//! Core data types for the geotutor engine
//!
//! Reference entities (triangle categories, questions, theorems, answer
//! options) are immutable within a session. Their live, per-session state
//! lives in [`crate::engine::BeliefState`] and [`crate::session::Session`].

use crate::error::{Result, TutorError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a triangle category (0 general, 1 equilateral, ...)
    TriangleId
);
numeric_id!(
    /// Identifier of a question
    QuestionId
);
numeric_id!(
    /// Identifier of an answer option (0 no, 1 yes, 2 don't know, 3 probably)
    AnswerId
);
numeric_id!(
    /// Identifier of a theorem
    TheoremId
);

/// Unique identifier for a learning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TutorError::InvalidInput(format!("malformed session id '{}': {}", s, e)))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A triangle classification over which learner intent is estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleCategory {
    pub id: TriangleId,
    pub label: String,
}

/// A geometry theorem that can be recommended to the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theorem {
    pub id: TheoremId,
    pub text: String,
    /// Triangle category the theorem belongs to, if any
    #[serde(default)]
    pub category: Option<TriangleId>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Corpus-wide share of sessions in which the theorem was marked helpful
    #[serde(default)]
    pub general_helpfulness: f64,
}

/// A diagnostic question asked to the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Difficulty tier (1 = easiest). Only used to pick the opening question.
    pub difficulty: u8,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub related_theorem: Option<TheoremId>,
}

/// One of the fixed answers a learner can give to any question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: AnswerId,
    pub label: String,
}

fn default_active() -> bool {
    true
}

/// Terminal feedback a learner gives when ending a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FeedbackCode {
    /// Did not succeed this time
    Retry,
    /// Solved the exercise
    Succeeded,
    /// Made progress, moving on to a new exercise
    ProgressedNewExercise,
    /// Go back to the question that was pending; does not end the session
    ReturnToExercise,
}

impl FeedbackCode {
    pub const ALL: [FeedbackCode; 4] = [
        FeedbackCode::Retry,
        FeedbackCode::Succeeded,
        FeedbackCode::ProgressedNewExercise,
        FeedbackCode::ReturnToExercise,
    ];

    /// Numeric code as stored in session records
    pub fn code(self) -> u8 {
        match self {
            FeedbackCode::Retry => 4,
            FeedbackCode::Succeeded => 5,
            FeedbackCode::ProgressedNewExercise => 6,
            FeedbackCode::ReturnToExercise => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeedbackCode::Retry => "did not succeed this time",
            FeedbackCode::Succeeded => "succeeded",
            FeedbackCode::ProgressedNewExercise => "progressed, trying a new exercise",
            FeedbackCode::ReturnToExercise => "return to the current question",
        }
    }

    /// Whether this feedback ends the session
    pub fn is_terminal(self) -> bool {
        !matches!(self, FeedbackCode::ReturnToExercise)
    }
}

impl TryFrom<u8> for FeedbackCode {
    type Error = TutorError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            4 => Ok(FeedbackCode::Retry),
            5 => Ok(FeedbackCode::Succeeded),
            6 => Ok(FeedbackCode::ProgressedNewExercise),
            7 => Ok(FeedbackCode::ReturnToExercise),
            other => Err(TutorError::InvalidInput(format!(
                "unknown feedback code {} (expected 4-7)",
                other
            ))),
        }
    }
}

impl From<FeedbackCode> for u8 {
    fn from(code: FeedbackCode) -> Self {
        code.code()
    }
}

impl std::fmt::Display for FeedbackCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
