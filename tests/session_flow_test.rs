//! End-to-end session flows against the fixture knowledge

mod common;

use common::{fixture_snapshot, fixture_tutor, play_through};
use geotutor_core::{
    error::ErrorKind, AnswerId, BeliefState, KnowledgeStore, QuestionId, QuestionSelector,
    SessionEnd, SessionState, TheoremId, TriangleId, TutorError,
};
use std::collections::BTreeSet;

#[test]
fn test_fresh_session_opens_with_easiest_question() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();

    for weight in session.belief().weights().values() {
        assert_eq!(*weight, 0.25);
    }

    // question 7 is tier 1 too, but inactive
    let question = tutor.first_question(&mut session).unwrap();
    assert_eq!(question.id, QuestionId(1));
    assert_eq!(session.belief().pending(), Some(QuestionId(1)));
}

#[test]
fn test_dynamic_multiplier_drives_update() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();

    let outcome = tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();

    // 0.25 * 2.0 / (0.25 * 2.0 + 0.25 + 0.25 + 0.25)
    assert!((outcome.weights[&TriangleId(2)] - 0.4).abs() < 1e-12);
    for t in [0, 1, 3] {
        assert!((outcome.weights[&TriangleId(t)] - 0.2).abs() < 1e-12);
    }
    assert_eq!(
        session.belief().most_likely().map(|(t, _)| t),
        Some(TriangleId(2))
    );
}

#[test]
fn test_ranking_after_answer() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();
    let outcome = tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();

    let order: Vec<TheoremId> = outcome.ranked.iter().map(|r| r.theorem_id).collect();
    assert_eq!(
        order,
        [2, 1, 5, 4, 3, 6].map(TheoremId).to_vec()
    );

    // 0.7 * 0.52 + 0.2 * 0.6 + 0.1 * 0.1
    let top = &outcome.ranked[0];
    assert!((top.combined_score - 0.494).abs() < 1e-9);
    assert!((top.specific_score - 0.6).abs() < 1e-12);

    // the inactive theorem never appears
    assert!(!order.contains(&TheoremId(7)));
}

#[test]
fn test_prerequisite_blocks_until_asked() {
    let snapshot = fixture_snapshot();
    let selector = QuestionSelector::default();
    let belief = BeliefState::initialize(snapshot.triangle_categories());

    let candidates: Vec<QuestionId> = selector
        .candidates(&snapshot, &belief)
        .iter()
        .map(|q| q.id)
        .collect();
    assert!(!candidates.contains(&QuestionId(5)));
    assert!(!candidates.contains(&QuestionId(6)));

    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let first = tutor.first_question(&mut session).unwrap();
    tutor
        .submit_answer(&mut session, first.id, AnswerId(0))
        .unwrap();

    let candidates: Vec<QuestionId> = selector
        .candidates(&snapshot, session.belief())
        .iter()
        .map(|q| q.id)
        .collect();
    assert!(candidates.contains(&QuestionId(5)));
    assert!(!candidates.contains(&QuestionId(6)));
}

#[test]
fn test_return_to_exercise_keeps_session_open() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();

    let end = tutor
        .end_session(&mut session, 7, vec![], vec![], true)
        .unwrap();
    assert_eq!(end, SessionEnd::Resume);
    assert_eq!(session.state(), SessionState::Open);
    assert!(session.resume_requested());

    // the same question comes back and can still be answered
    let resumed = tutor.next_question(&mut session).unwrap();
    assert_eq!(resumed.id, question.id);
    assert!(!session.resume_requested());
    tutor
        .submit_answer(&mut session, resumed.id, AnswerId(1))
        .unwrap();
}

#[test]
fn test_return_after_answering_never_repeats() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();
    tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();

    tutor
        .end_session(&mut session, 7, vec![], vec![], true)
        .unwrap();
    let next = tutor.next_question(&mut session).unwrap();

    assert_ne!(next.id, question.id);
    assert!(!session.resume_requested());
    tutor
        .submit_answer(&mut session, next.id, AnswerId(0))
        .unwrap();
    assert_eq!(session.log().len(), 2);
}

#[test]
fn test_unknown_feedback_leaves_session_unchanged() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();
    tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();
    let before = session.belief().clone();

    let err = tutor
        .end_session(&mut session, 9, vec![], vec![], true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(session.state(), SessionState::Open);
    assert!(!session.resume_requested());
    assert_eq!(session.belief(), &before);
    assert_eq!(session.log().len(), 1);
}

#[test]
fn test_unknown_triangle_type_is_rejected() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    tutor.first_question(&mut session).unwrap();

    let err = tutor
        .end_session(&mut session, 5, vec![TriangleId(9)], vec![], true)
        .unwrap_err();
    assert!(matches!(err, TutorError::InvalidInput(_)));
    assert!(session.is_open());
}

#[test]
fn test_out_of_order_answer() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    tutor.first_question(&mut session).unwrap();

    let err = tutor
        .submit_answer(&mut session, QuestionId(2), AnswerId(1))
        .unwrap_err();
    assert!(matches!(
        err,
        TutorError::OutOfOrder {
            expected: Some(QuestionId(1)),
            got: QuestionId(2)
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(session.log().is_empty());
}

#[test]
fn test_unknown_ids_are_not_found() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();

    let err = tutor
        .submit_answer(&mut session, question.id, AnswerId(42))
        .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)));

    let err = tutor
        .rank_theorems(&session, Some(QuestionId(99)), Some(AnswerId(1)), None)
        .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)));
}

#[test]
fn test_full_session_asks_every_active_question_once() {
    let tutor = fixture_tutor();
    let log = play_through(&tutor, 1, &[2], &[2]);

    let asked: Vec<QuestionId> = log.interactions.iter().map(|i| i.question_id).collect();
    let unique: BTreeSet<QuestionId> = asked.iter().copied().collect();
    assert_eq!(asked.len(), 6);
    assert_eq!(unique.len(), asked.len());
    assert!(!unique.contains(&QuestionId(7)));

    let position = |q: u32| asked.iter().position(|id| *id == QuestionId(q)).unwrap();
    assert!(position(1) < position(5));
    assert!(position(3) < position(6));
}

#[test]
fn test_exhausted_session_reports_natural_end() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let mut question = tutor.first_question(&mut session).unwrap();

    let err = loop {
        tutor
            .submit_answer(&mut session, question.id, AnswerId(2))
            .unwrap();
        match tutor.next_question(&mut session) {
            Ok(next) => question = next,
            Err(e) => break e,
        }
    };

    assert!(err.is_exhausted());
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(session.is_open());
}

#[test]
fn test_closed_session_rejects_further_operations() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();
    tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();

    let end = tutor
        .end_session(&mut session, 5, vec![TriangleId(2)], vec![TheoremId(2)], true)
        .unwrap();
    let SessionEnd::Closed(log) = end else {
        panic!("expected a closed session");
    };
    assert_eq!(log.triangle_types, vec![TriangleId(2)]);
    assert_eq!(log.helpful_theorems, vec![TheoremId(2)]);
    assert!(log.ended_at.is_some());

    assert_eq!(session.state(), SessionState::Closed);
    let err = tutor.next_question(&mut session).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = tutor
        .end_session(&mut session, 5, vec![], vec![], true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_not_persisting_abandons() {
    let tutor = fixture_tutor();
    let mut session = tutor.start_session();
    let question = tutor.first_question(&mut session).unwrap();
    tutor
        .submit_answer(&mut session, question.id, AnswerId(1))
        .unwrap();

    let end = tutor
        .end_session(&mut session, 4, vec![], vec![], false)
        .unwrap();
    assert_eq!(end, SessionEnd::Abandoned);
    assert_eq!(session.state(), SessionState::Abandoned);
    assert!(session.log().is_empty());
}
