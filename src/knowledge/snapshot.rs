//! In-memory knowledge snapshot.
//!
//! A [`KnowledgeSnapshot`] is an immutable, fully validated copy of the
//! reference tables. Sessions read it concurrently; calibration produces a
//! new snapshot that replaces the old one wholesale (see
//! [`super::SharedKnowledge`]).

use super::KnowledgeStore;
use crate::error::{Result, TutorError};
use crate::types::{
    AnswerId, AnswerOption, Question, QuestionId, Theorem, TheoremId, TriangleCategory, TriangleId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// (question, answer, triangle)
pub type MultiplierKey = (QuestionId, AnswerId, TriangleId);

/// (question, answer, theorem)
pub type TheoremScoreKey = (QuestionId, AnswerId, TheoremId);

/// Which tier a resolved multiplier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplierTier {
    Dynamic,
    Initial,
    Neutral,
}

/// Neutral multiplier used when neither tier has a record
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Two-tier multiplier table.
///
/// Lookups walk the tiers in fixed priority: Dynamic, then Initial, then the
/// neutral 1.0. A Dynamic record always shadows the Initial record with the
/// same key.
#[derive(Debug, Clone, Default)]
pub struct MultiplierTable {
    dynamic: HashMap<MultiplierKey, f64>,
    initial: HashMap<MultiplierKey, f64>,
}

impl MultiplierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_initial(&mut self, key: MultiplierKey, factor: f64) {
        self.initial.insert(key, factor);
    }

    pub fn insert_dynamic(&mut self, key: MultiplierKey, factor: f64) {
        self.dynamic.insert(key, factor);
    }

    /// Resolve a multiplier and report the tier that supplied it
    pub fn lookup(&self, key: &MultiplierKey) -> (f64, MultiplierTier) {
        [
            (&self.dynamic, MultiplierTier::Dynamic),
            (&self.initial, MultiplierTier::Initial),
        ]
        .iter()
        .find_map(|(table, tier)| table.get(key).map(|factor| (*factor, *tier)))
        .unwrap_or((NEUTRAL_MULTIPLIER, MultiplierTier::Neutral))
    }

    pub fn resolve(&self, key: &MultiplierKey) -> f64 {
        self.lookup(key).0
    }

    pub fn initial(&self) -> &HashMap<MultiplierKey, f64> {
        &self.initial
    }

    pub fn dynamic(&self) -> &HashMap<MultiplierKey, f64> {
        &self.dynamic
    }

    /// Replace the whole Dynamic tier (used by calibration)
    pub fn replace_dynamic(&mut self, dynamic: HashMap<MultiplierKey, f64>) {
        self.dynamic = dynamic;
    }

    fn validate(&self) -> Result<()> {
        for (tier, table) in [("initial", &self.initial), ("dynamic", &self.dynamic)] {
            for ((q, a, t), factor) in table {
                if !factor.is_finite() || *factor < 0.0 {
                    return Err(TutorError::InvalidInput(format!(
                        "{} multiplier for (question {}, answer {}, triangle {}) must be finite and non-negative, got {}",
                        tier, q, a, t, factor
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Immutable, validated view of all reference tables
#[derive(Debug, Clone)]
pub struct KnowledgeSnapshot {
    triangles: Vec<TriangleCategory>,
    answers: Vec<AnswerOption>,
    questions: BTreeMap<QuestionId, Question>,
    theorems: BTreeMap<TheoremId, Theorem>,
    prerequisites: HashMap<QuestionId, BTreeSet<QuestionId>>,
    multipliers: MultiplierTable,
    theorem_triangles: HashMap<(TheoremId, TriangleId), f64>,
    question_theorems: BTreeMap<QuestionId, BTreeSet<TheoremId>>,
    theorem_scores: HashMap<TheoremScoreKey, f64>,
}

impl KnowledgeSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }

    pub fn theorems(&self) -> impl Iterator<Item = &Theorem> {
        self.theorems.values()
    }

    pub fn multipliers(&self) -> &MultiplierTable {
        &self.multipliers
    }

    pub fn theorem_scores(&self) -> &HashMap<TheoremScoreKey, f64> {
        &self.theorem_scores
    }

    pub fn theorem_triangles(&self) -> &HashMap<(TheoremId, TriangleId), f64> {
        &self.theorem_triangles
    }

    pub fn prerequisite_edges(&self) -> impl Iterator<Item = (QuestionId, QuestionId)> + '_ {
        self.prerequisites
            .iter()
            .flat_map(|(q, reqs)| reqs.iter().map(move |r| (*q, *r)))
    }

    pub fn question_theorem_edges(&self) -> impl Iterator<Item = (QuestionId, TheoremId)> + '_ {
        self.question_theorems
            .iter()
            .flat_map(|(q, ths)| ths.iter().map(move |th| (*q, *th)))
    }

    pub fn has_triangle(&self, id: TriangleId) -> bool {
        self.triangles.iter().any(|t| t.id == id)
    }

    pub fn has_answer(&self, id: AnswerId) -> bool {
        self.answers.iter().any(|a| a.id == id)
    }

    /// Copy of this snapshot with a new Dynamic multiplier tier
    pub fn with_dynamic_multipliers(&self, dynamic: HashMap<MultiplierKey, f64>) -> Result<Self> {
        let mut next = self.clone();
        next.multipliers.replace_dynamic(dynamic);
        next.multipliers.validate()?;
        Ok(next)
    }

    /// Copy of this snapshot with a new theorem-score table
    pub fn with_theorem_scores(&self, scores: HashMap<TheoremScoreKey, f64>) -> Self {
        let mut next = self.clone();
        next.theorem_scores = scores;
        next
    }

    /// Copy of this snapshot with refreshed general helpfulness values.
    /// Theorems missing from `values` keep their current helpfulness.
    pub fn with_general_helpfulness(&self, values: &HashMap<TheoremId, f64>) -> Self {
        let mut next = self.clone();
        for (id, theorem) in next.theorems.iter_mut() {
            if let Some(value) = values.get(id) {
                theorem.general_helpfulness = *value;
            }
        }
        next
    }
}

impl KnowledgeStore for KnowledgeSnapshot {
    fn triangle_categories(&self) -> &[TriangleCategory] {
        &self.triangles
    }

    fn answer_options(&self) -> &[AnswerOption] {
        &self.answers
    }

    fn active_questions(&self) -> Vec<&Question> {
        self.questions.values().filter(|q| q.active).collect()
    }

    fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    fn prerequisites(&self, id: QuestionId) -> BTreeSet<QuestionId> {
        self.prerequisites.get(&id).cloned().unwrap_or_default()
    }

    fn multiplier(&self, question: QuestionId, answer: AnswerId, triangle: TriangleId) -> f64 {
        self.multipliers.resolve(&(question, answer, triangle))
    }

    fn theorem_triangle_weight(&self, theorem: TheoremId, triangle: TriangleId) -> f64 {
        self.theorem_triangles
            .get(&(theorem, triangle))
            .copied()
            .unwrap_or(0.0)
    }

    fn theorem_score(&self, question: QuestionId, answer: AnswerId, theorem: TheoremId) -> f64 {
        self.theorem_scores
            .get(&(question, answer, theorem))
            .copied()
            .unwrap_or(0.0)
    }

    fn active_theorems(&self) -> Vec<&Theorem> {
        self.theorems.values().filter(|t| t.active).collect()
    }

    fn theorem(&self, id: TheoremId) -> Option<&Theorem> {
        self.theorems.get(&id)
    }
}

/// Builder that collects reference rows and validates them into a snapshot
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    triangles: BTreeMap<TriangleId, TriangleCategory>,
    answers: BTreeMap<AnswerId, AnswerOption>,
    questions: BTreeMap<QuestionId, Question>,
    theorems: BTreeMap<TheoremId, Theorem>,
    prerequisites: HashMap<QuestionId, BTreeSet<QuestionId>>,
    multipliers: MultiplierTable,
    theorem_triangles: HashMap<(TheoremId, TriangleId), f64>,
    question_theorems: BTreeMap<QuestionId, BTreeSet<TheoremId>>,
    theorem_scores: HashMap<TheoremScoreKey, f64>,
}

impl SnapshotBuilder {
    /// The four standard triangle categories
    pub fn default_triangles(self) -> Self {
        self.triangle(0, "general")
            .triangle(1, "equilateral")
            .triangle(2, "isosceles")
            .triangle(3, "right-angled")
    }

    /// The four standard answer options
    pub fn default_answers(self) -> Self {
        self.answer(0, "no")
            .answer(1, "yes")
            .answer(2, "don't know")
            .answer(3, "probably")
    }

    pub fn triangle(mut self, id: u32, label: &str) -> Self {
        let id = TriangleId(id);
        self.triangles.insert(
            id,
            TriangleCategory {
                id,
                label: label.to_string(),
            },
        );
        self
    }

    pub fn answer(mut self, id: u32, label: &str) -> Self {
        let id = AnswerId(id);
        self.answers.insert(
            id,
            AnswerOption {
                id,
                label: label.to_string(),
            },
        );
        self
    }

    pub fn question(mut self, question: Question) -> Self {
        self.questions.insert(question.id, question);
        self
    }

    pub fn theorem(mut self, theorem: Theorem) -> Self {
        self.theorems.insert(theorem.id, theorem);
        self
    }

    /// `question` may only be asked once `requires` has been asked
    pub fn prerequisite(mut self, question: u32, requires: u32) -> Self {
        self.prerequisites
            .entry(QuestionId(question))
            .or_default()
            .insert(QuestionId(requires));
        self
    }

    pub fn initial_multiplier(mut self, question: u32, answer: u32, triangle: u32, factor: f64) -> Self {
        self.multipliers.insert_initial(
            (QuestionId(question), AnswerId(answer), TriangleId(triangle)),
            factor,
        );
        self
    }

    pub fn dynamic_multiplier(mut self, question: u32, answer: u32, triangle: u32, factor: f64) -> Self {
        self.multipliers.insert_dynamic(
            (QuestionId(question), AnswerId(answer), TriangleId(triangle)),
            factor,
        );
        self
    }

    pub fn theorem_triangle(mut self, theorem: u32, triangle: u32, weight: f64) -> Self {
        self.theorem_triangles
            .insert((TheoremId(theorem), TriangleId(triangle)), weight);
        self
    }

    pub fn theorem_question(mut self, theorem: u32, question: u32) -> Self {
        self.question_theorems
            .entry(QuestionId(question))
            .or_default()
            .insert(TheoremId(theorem));
        self
    }

    pub fn theorem_score(mut self, question: u32, answer: u32, theorem: u32, score: f64) -> Self {
        self.theorem_scores.insert(
            (QuestionId(question), AnswerId(answer), TheoremId(theorem)),
            score,
        );
        self
    }

    /// Validate references and produce the snapshot
    pub fn build(self) -> Result<KnowledgeSnapshot> {
        if self.triangles.is_empty() {
            return Err(TutorError::InvalidInput(
                "knowledge needs at least one triangle category".to_string(),
            ));
        }
        if self.answers.is_empty() {
            return Err(TutorError::InvalidInput(
                "knowledge needs at least one answer option".to_string(),
            ));
        }

        self.multipliers.validate()?;

        for (question, requires) in &self.prerequisites {
            if !self.questions.contains_key(question) {
                return Err(unknown("question", question));
            }
            for required in requires {
                if !self.questions.contains_key(required) {
                    return Err(unknown("prerequisite question", required));
                }
                if required == question {
                    warn!("Question {} lists itself as a prerequisite and can never be asked", question);
                }
            }
        }

        for ((theorem, triangle), weight) in &self.theorem_triangles {
            if !self.theorems.contains_key(theorem) {
                return Err(unknown("theorem", theorem));
            }
            if !self.triangles.contains_key(triangle) {
                return Err(unknown("triangle", triangle));
            }
            if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
                return Err(TutorError::InvalidInput(format!(
                    "theorem/triangle weight for ({}, {}) must be within [0, 1], got {}",
                    theorem, triangle, weight
                )));
            }
        }

        for ((q, a, th), score) in &self.theorem_scores {
            if !score.is_finite() {
                return Err(TutorError::InvalidInput(format!(
                    "theorem score for ({}, {}, {}) is not finite",
                    q, a, th
                )));
            }
        }

        for theorem in self.theorems.values() {
            if let Some(category) = theorem.category {
                if !self.triangles.contains_key(&category) {
                    return Err(unknown("theorem category", &category));
                }
            }
        }

        let mut questions = self.questions;
        for (question_id, theorems) in &self.question_theorems {
            for theorem in theorems {
                if !self.theorems.contains_key(theorem) {
                    return Err(unknown("theorem", theorem));
                }
            }
            let question = questions
                .get_mut(question_id)
                .ok_or_else(|| unknown("question", question_id))?;
            if question.related_theorem.is_none() {
                question.related_theorem = theorems.iter().next().copied();
            }
        }

        for question in questions.values() {
            if let Some(theorem) = question.related_theorem {
                if !self.theorems.contains_key(&theorem) {
                    return Err(unknown("related theorem", &theorem));
                }
            }
        }

        debug!(
            "Built knowledge snapshot: {} triangles, {} questions, {} theorems, {} initial / {} dynamic multipliers",
            self.triangles.len(),
            questions.len(),
            self.theorems.len(),
            self.multipliers.initial().len(),
            self.multipliers.dynamic().len()
        );

        Ok(KnowledgeSnapshot {
            triangles: self.triangles.into_values().collect(),
            answers: self.answers.into_values().collect(),
            questions,
            theorems: self.theorems,
            prerequisites: self.prerequisites,
            multipliers: self.multipliers,
            theorem_triangles: self.theorem_triangles,
            question_theorems: self.question_theorems,
            theorem_scores: self.theorem_scores,
        })
    }
}

fn unknown(what: &str, id: &dyn std::fmt::Display) -> TutorError {
    TutorError::InvalidInput(format!("reference to unknown {} {}", what, id))
}
