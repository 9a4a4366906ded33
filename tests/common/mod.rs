//! Common test utilities and helpers

#![allow(dead_code)]

use geotutor_core::{
    InteractionLog, KnowledgeSeed, KnowledgeSnapshot, Question, QuestionId, SessionEnd,
    SharedKnowledge, Tutor,
};
use std::path::PathBuf;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("knowledge_seed.json")
}

/// The fixture knowledge: seven questions (one inactive), seven theorems
/// (one inactive), prerequisites 5 → 1 and 6 → 3, and a Dynamic multiplier
/// of 2.0 for (1, yes, isosceles)
pub fn fixture_snapshot() -> KnowledgeSnapshot {
    KnowledgeSeed::from_file(&fixture_path())
        .and_then(KnowledgeSeed::into_snapshot)
        .expect("fixture seed is valid")
}

/// Active question with placeholder text
pub fn question(id: u32, difficulty: u8) -> Question {
    Question {
        id: QuestionId(id),
        text: format!("Question {}", id),
        difficulty,
        active: true,
        related_theorem: None,
    }
}

pub fn fixture_tutor() -> Tutor {
    Tutor::new(SharedKnowledge::new(fixture_snapshot()))
}

/// Run a full session answering every question with `answer`, closing it
/// with feedback 5
pub fn play_through(tutor: &Tutor, answer: u32, triangles: &[u32], helpful: &[u32]) -> InteractionLog {
    let mut session = tutor.start_session();
    let mut question = tutor.first_question(&mut session).expect("opening question");
    loop {
        tutor
            .submit_answer(&mut session, question.id, answer.into())
            .expect("answer accepted");
        match tutor.next_question(&mut session) {
            Ok(next) => question = next,
            Err(e) if e.is_exhausted() => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let end = tutor
        .end_session(
            &mut session,
            5,
            triangles.iter().map(|t| (*t).into()).collect(),
            helpful.iter().map(|t| (*t).into()).collect(),
            true,
        )
        .expect("session ends");
    match end {
        SessionEnd::Closed(log) => log,
        other => panic!("expected a closed session, got {:?}", other),
    }
}
