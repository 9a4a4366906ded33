//! JSON knowledge seed files.
//!
//! A seed is the portable form of the reference tables, used by
//! `geotutor import` to populate a knowledge database.

use super::{KnowledgeSnapshot, KnowledgeStore, MultiplierKey};
use crate::error::Result;
use crate::types::{
    AnswerId, AnswerOption, Question, QuestionId, Theorem, TheoremId, TriangleCategory, TriangleId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerequisiteRow {
    pub question: QuestionId,
    pub requires: QuestionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoremTriangleRow {
    pub theorem: TheoremId,
    pub triangle: TriangleId,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoremQuestionRow {
    pub theorem: TheoremId,
    pub question: QuestionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplierRow {
    pub question: QuestionId,
    pub answer: AnswerId,
    pub triangle: TriangleId,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoremScoreRow {
    pub question: QuestionId,
    pub answer: AnswerId,
    pub theorem: TheoremId,
    pub score: f64,
}

/// Portable knowledge tables. Empty triangle or answer lists fall back to
/// the standard four categories and four answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSeed {
    #[serde(default)]
    pub triangles: Vec<TriangleCategory>,
    #[serde(default)]
    pub answers: Vec<AnswerOption>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub theorems: Vec<Theorem>,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteRow>,
    #[serde(default)]
    pub theorem_triangles: Vec<TheoremTriangleRow>,
    #[serde(default)]
    pub theorem_questions: Vec<TheoremQuestionRow>,
    #[serde(default)]
    pub initial_multipliers: Vec<MultiplierRow>,
    #[serde(default)]
    pub dynamic_multipliers: Vec<MultiplierRow>,
    #[serde(default)]
    pub theorem_scores: Vec<TheoremScoreRow>,
}

impl KnowledgeSeed {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading knowledge seed from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Validate the seed and turn it into a snapshot
    pub fn into_snapshot(self) -> Result<KnowledgeSnapshot> {
        let mut builder = KnowledgeSnapshot::builder();

        if self.triangles.is_empty() {
            builder = builder.default_triangles();
        }
        for triangle in &self.triangles {
            builder = builder.triangle(triangle.id.0, &triangle.label);
        }

        if self.answers.is_empty() {
            builder = builder.default_answers();
        }
        for answer in &self.answers {
            builder = builder.answer(answer.id.0, &answer.label);
        }

        for question in self.questions {
            builder = builder.question(question);
        }
        for theorem in self.theorems {
            builder = builder.theorem(theorem);
        }
        for row in self.prerequisites {
            builder = builder.prerequisite(row.question.0, row.requires.0);
        }
        for row in self.theorem_triangles {
            builder = builder.theorem_triangle(row.theorem.0, row.triangle.0, row.weight);
        }
        for row in self.theorem_questions {
            builder = builder.theorem_question(row.theorem.0, row.question.0);
        }
        for row in self.initial_multipliers {
            builder =
                builder.initial_multiplier(row.question.0, row.answer.0, row.triangle.0, row.multiplier);
        }
        for row in self.dynamic_multipliers {
            builder =
                builder.dynamic_multiplier(row.question.0, row.answer.0, row.triangle.0, row.multiplier);
        }
        for row in self.theorem_scores {
            builder = builder.theorem_score(row.question.0, row.answer.0, row.theorem.0, row.score);
        }

        builder.build()
    }
}

impl From<&KnowledgeSnapshot> for KnowledgeSeed {
    fn from(snapshot: &KnowledgeSnapshot) -> Self {
        let mut theorem_triangles: Vec<TheoremTriangleRow> = snapshot
            .theorem_triangles()
            .iter()
            .map(|(&(theorem, triangle), &weight)| TheoremTriangleRow {
                theorem,
                triangle,
                weight,
            })
            .collect();
        theorem_triangles.sort_by_key(|r| (r.theorem, r.triangle));

        let mut theorem_scores: Vec<TheoremScoreRow> = snapshot
            .theorem_scores()
            .iter()
            .map(|(&(question, answer, theorem), &score)| TheoremScoreRow {
                question,
                answer,
                theorem,
                score,
            })
            .collect();
        theorem_scores.sort_by_key(|r| (r.question, r.answer, r.theorem));

        let mut prerequisites: Vec<PrerequisiteRow> = snapshot
            .prerequisite_edges()
            .map(|(question, requires)| PrerequisiteRow { question, requires })
            .collect();
        prerequisites.sort_by_key(|r| (r.question, r.requires));

        Self {
            triangles: snapshot.triangle_categories().to_vec(),
            answers: snapshot.answer_options().to_vec(),
            questions: snapshot.questions().cloned().collect(),
            theorems: snapshot.theorems().cloned().collect(),
            prerequisites,
            theorem_triangles,
            theorem_questions: snapshot
                .question_theorem_edges()
                .map(|(question, theorem)| TheoremQuestionRow { theorem, question })
                .collect(),
            initial_multipliers: multiplier_rows(snapshot.multipliers().initial()),
            dynamic_multipliers: multiplier_rows(snapshot.multipliers().dynamic()),
            theorem_scores,
        }
    }
}

fn multiplier_rows(table: &HashMap<MultiplierKey, f64>) -> Vec<MultiplierRow> {
    let mut rows: Vec<MultiplierRow> = table
        .iter()
        .map(|(&(question, answer, triangle), &multiplier)| MultiplierRow {
            question,
            answer,
            triangle,
            multiplier,
        })
        .collect();
    rows.sort_by_key(|r| (r.question, r.answer, r.triangle));
    rows
}
