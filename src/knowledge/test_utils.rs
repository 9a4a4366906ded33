//! Test utilities for knowledge fixtures
//!
//! Provides a small, fully wired knowledge snapshot so engine and session
//! tests don't need a database.

use super::KnowledgeSnapshot;
use crate::types::{Question, QuestionId, Theorem, TheoremId};

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

/// Active theorem without a category
pub fn theorem(id: u32, text: &str) -> Theorem {
    Theorem {
        id: TheoremId(id),
        text: text.to_string(),
        category: None,
        active: true,
        general_helpfulness: 0.0,
    }
}

fn categorized(id: u32, text: &str, category: u32, helpfulness: f64) -> Theorem {
    Theorem {
        category: Some(category.into()),
        general_helpfulness: helpfulness,
        ..theorem(id, text)
    }
}

/// Four triangle categories, four answers, six questions and five theorems.
///
/// - question 1 is the only active tier-1 question
/// - question 5 requires question 1
/// - question 6 is inactive
/// - the Dynamic multiplier for (1, yes, isosceles) is 2.0 and shadows an
///   Initial 1.5; every other (1, yes, *) multiplier is neutral
/// - theorem 5 is inactive
pub fn sample_snapshot() -> KnowledgeSnapshot {
    let mut q6 = question(6, 1);
    q6.active = false;
    let mut th5 = theorem(5, "Retired theorem");
    th5.active = false;

    KnowledgeSnapshot::builder()
        .default_triangles()
        .default_answers()
        .question(question(1, 1))
        .question(question(2, 2))
        .question(question(3, 2))
        .question(question(4, 3))
        .question(question(5, 2))
        .question(q6)
        .prerequisite(5, 1)
        .theorem(categorized(1, "The angles of a triangle sum to 180 degrees", 0, 0.3))
        .theorem(categorized(2, "Base angles of an isosceles triangle are equal", 2, 0.1))
        .theorem(categorized(3, "Each angle of an equilateral triangle is 60 degrees", 1, 0.05))
        .theorem(categorized(4, "Pythagorean theorem", 3, 0.2))
        .theorem(th5)
        .theorem_triangle(1, 0, 1.0)
        .theorem_triangle(1, 1, 0.5)
        .theorem_triangle(1, 2, 0.5)
        .theorem_triangle(1, 3, 0.5)
        .theorem_triangle(2, 2, 1.0)
        .theorem_triangle(2, 1, 0.6)
        .theorem_triangle(3, 1, 1.0)
        .theorem_triangle(4, 3, 1.0)
        .theorem_triangle(5, 0, 1.0)
        .theorem_question(4, 1)
        .theorem_question(2, 2)
        .theorem_question(3, 3)
        .theorem_question(2, 4)
        .theorem_question(4, 5)
        .initial_multiplier(1, 1, 2, 1.5)
        .dynamic_multiplier(1, 1, 2, 2.0)
        .initial_multiplier(1, 0, 2, 0.5)
        .initial_multiplier(2, 1, 2, 3.0)
        .initial_multiplier(2, 1, 1, 1.5)
        .initial_multiplier(2, 0, 2, 0.3)
        .initial_multiplier(2, 0, 1, 0.3)
        .initial_multiplier(3, 1, 1, 4.0)
        .initial_multiplier(3, 0, 1, 0.1)
        .initial_multiplier(4, 1, 2, 1.5)
        .initial_multiplier(4, 1, 0, 1.2)
        .initial_multiplier(5, 1, 3, 3.0)
        .initial_multiplier(5, 0, 3, 0.2)
        .theorem_score(1, 1, 2, 0.5)
        .theorem_score(1, 1, 4, 0.1)
        .build()
        .expect("sample snapshot is valid")
}
