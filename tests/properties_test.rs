//! Property tests for belief updates, selection and ranking

mod common;

use common::{fixture_tutor, question};
use geotutor_core::{
    AnswerId, BeliefState, KnowledgeSnapshot, KnowledgeStore, QuestionId, SharedKnowledge,
    TheoremRanker, Tutor,
};
use geotutor_core::engine::RankingWeights;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn assert_normalized(belief: &BeliefState) {
    let sum: f64 = belief.weights().values().sum();
    assert!((sum - 1.0).abs() < 1e-9, "weights sum to {}", sum);
    assert!(belief.weights().values().all(|w| *w >= 0.0));
}

/// Three questions whose (question, answer, triangle) multipliers come from
/// `factors`, zeros included
fn snapshot_with_factors(factors: &[f64]) -> KnowledgeSnapshot {
    let mut builder = KnowledgeSnapshot::builder()
        .default_triangles()
        .default_answers()
        .question(question(1, 1))
        .question(question(2, 1))
        .question(question(3, 1));

    let mut factors = factors.iter().cycle();
    for q in 1..=3 {
        for a in 0..4 {
            for t in 0..4 {
                if let Some(factor) = factors.next() {
                    builder = builder.initial_multiplier(q, a, t, *factor);
                }
            }
        }
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn prop_weights_stay_normalized(answers in prop::collection::vec(0u32..4, 1..10)) {
        let tutor = fixture_tutor();
        let mut session = tutor.start_session();
        let mut question = tutor.first_question(&mut session).unwrap();

        for answer in answers {
            tutor.submit_answer(&mut session, question.id, AnswerId(answer)).unwrap();
            assert_normalized(session.belief());
            match tutor.next_question(&mut session) {
                Ok(next) => question = next,
                Err(e) => {
                    prop_assert!(e.is_exhausted());
                    break;
                }
            }
        }
    }

    #[test]
    fn prop_collapse_recovers_uniform(
        factors in prop::collection::vec(prop_oneof![Just(0.0), 0.0f64..5.0], 1..48),
        answers in prop::collection::vec(0u32..4, 3),
    ) {
        let tutor = Tutor::new(SharedKnowledge::new(snapshot_with_factors(&factors)));
        let mut session = tutor.start_session();
        let mut question = tutor.first_question(&mut session).unwrap();

        for answer in answers {
            tutor.submit_answer(&mut session, question.id, AnswerId(answer)).unwrap();
            assert_normalized(session.belief());
            match tutor.next_question(&mut session) {
                Ok(next) => question = next,
                Err(_) => break,
            }
        }
    }

    #[test]
    fn prop_no_repeats_and_prerequisites_hold(answers in prop::collection::vec(0u32..4, 6)) {
        let tutor = fixture_tutor();
        let snapshot = tutor.knowledge().snapshot();
        let mut session = tutor.start_session();
        let mut question = tutor.first_question(&mut session).unwrap();
        let mut asked = BTreeSet::new();

        for answer in answers {
            prop_assert!(asked.insert(question.id), "question {} repeated", question.id);
            for required in snapshot.prerequisites(question.id) {
                prop_assert!(asked.contains(&required));
            }
            tutor.submit_answer(&mut session, question.id, AnswerId(answer)).unwrap();
            match tutor.next_question(&mut session) {
                Ok(next) => question = next,
                Err(_) => break,
            }
        }
    }

    #[test]
    fn prop_higher_threshold_returns_prefix(
        answer in 0u32..4,
        low in 0.0f64..0.3,
        delta in 0.0f64..0.3,
    ) {
        let tutor = fixture_tutor();
        let snapshot = tutor.knowledge().snapshot();
        let mut session = tutor.start_session();
        let q = tutor.first_question(&mut session).unwrap();
        tutor.submit_answer(&mut session, q.id, AnswerId(answer)).unwrap();

        let ranker = TheoremRanker::new(RankingWeights::default());
        let weights = session.belief().weights();
        let relaxed = ranker
            .rank(&*snapshot, weights, Some(q.id), Some(AnswerId(answer)), low)
            .unwrap();
        let strict = ranker
            .rank(&*snapshot, weights, Some(q.id), Some(AnswerId(answer)), low + delta)
            .unwrap();

        prop_assert!(strict.len() <= relaxed.len());
        prop_assert_eq!(&relaxed[..strict.len()], &strict[..]);
        prop_assert!(strict.iter().all(|r| r.combined_score >= low + delta));
        prop_assert!(relaxed.windows(2).all(|w| w[0].combined_score >= w[1].combined_score));
    }

    #[test]
    fn prop_ranking_is_idempotent(answer in 0u32..4) {
        let tutor = fixture_tutor();
        let mut session = tutor.start_session();
        let q = tutor.first_question(&mut session).unwrap();
        tutor.submit_answer(&mut session, q.id, AnswerId(answer)).unwrap();

        let first = tutor.rank_theorems(&session, Some(QuestionId(1)), Some(AnswerId(answer)), None).unwrap();
        let second = tutor.rank_theorems(&session, Some(QuestionId(1)), Some(AnswerId(answer)), None).unwrap();
        prop_assert_eq!(first, second);
    }
}
