// Theorem Score Calibration
//
// Two batch jobs over stored sessions:
// - theorem scores: for every answered (q, a), the share of those
//   interactions whose session listed the theorem as helpful
// - general helpfulness: the share of sessions that listed the theorem as
//   helpful at all

use super::{CalibrationJob, CalibrationUpdate, HelpfulnessRecord, TheoremScoreRecord};
use crate::error::Result;
use crate::knowledge::{KnowledgeSnapshot, KnowledgeStore};
use crate::session::InteractionLog;
use crate::types::{AnswerId, QuestionId, TheoremId};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Recomputes `TheoremScore[q, a, theorem] = helpful / total`
#[derive(Debug, Default)]
pub struct TheoremScoreCalibrator;

impl TheoremScoreCalibrator {
    pub fn calibrate(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Vec<TheoremScoreRecord> {
        let mut totals: HashMap<(QuestionId, AnswerId), u64> = HashMap::new();
        let mut helpful: BTreeMap<(QuestionId, AnswerId, TheoremId), u64> = BTreeMap::new();

        for log in logs {
            let listed: BTreeSet<TheoremId> = log.helpful_theorems.iter().copied().collect();
            for (question, answer) in log.pairs() {
                *totals.entry((question, answer)).or_default() += 1;
                for theorem in &listed {
                    *helpful.entry((question, answer, *theorem)).or_default() += 1;
                }
            }
        }

        let records: Vec<TheoremScoreRecord> = helpful
            .into_iter()
            .filter(|((_, _, theorem), _)| {
                let known = knowledge.theorem(*theorem).is_some();
                if !known {
                    warn!("Skipping score for unknown theorem {}", theorem);
                }
                known
            })
            .filter_map(|((question, answer, theorem), helpful)| {
                let total = totals.get(&(question, answer)).copied()?;
                Some(TheoremScoreRecord {
                    key: (question, answer, theorem),
                    total,
                    helpful,
                    score: helpful as f64 / total as f64,
                })
            })
            .collect();

        debug!(
            "Computed {} theorem scores from {} sessions",
            records.len(),
            logs.len()
        );
        records
    }
}

#[async_trait]
impl CalibrationJob for TheoremScoreCalibrator {
    fn name(&self) -> &str {
        "theorem_scores"
    }

    async fn run(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Result<CalibrationUpdate> {
        Ok(CalibrationUpdate::TheoremScores(self.calibrate(knowledge, logs)))
    }
}

/// Recomputes general helpfulness as helpful sessions / all sessions
#[derive(Debug, Default)]
pub struct HelpfulnessCalibrator;

impl HelpfulnessCalibrator {
    /// One record per known theorem; empty when there are no sessions
    pub fn calibrate(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Vec<HelpfulnessRecord> {
        if logs.is_empty() {
            debug!("No sessions; general helpfulness unchanged");
            return Vec::new();
        }

        let mut counts: HashMap<TheoremId, u64> = HashMap::new();
        for log in logs {
            let unique: BTreeSet<TheoremId> = log.helpful_theorems.iter().copied().collect();
            for theorem in unique {
                *counts.entry(theorem).or_default() += 1;
            }
        }

        let sessions = logs.len() as f64;
        knowledge
            .theorems()
            .map(|theorem| {
                let helpful_sessions = counts.get(&theorem.id).copied().unwrap_or(0);
                HelpfulnessRecord {
                    theorem: theorem.id,
                    helpful_sessions,
                    value: helpful_sessions as f64 / sessions,
                }
            })
            .collect()
    }
}

#[async_trait]
impl CalibrationJob for HelpfulnessCalibrator {
    fn name(&self) -> &str {
        "general_helpfulness"
    }

    async fn run(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Result<CalibrationUpdate> {
        Ok(CalibrationUpdate::Helpfulness(self.calibrate(knowledge, logs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::test_utils::sample_snapshot;
    use crate::types::{FeedbackCode, SessionId};

    fn log_with(pairs: &[(u32, u32)], helpful: &[u32]) -> InteractionLog {
        let mut log = InteractionLog::new(SessionId::new());
        for (q, a) in pairs {
            log.record(QuestionId(*q), AnswerId(*a));
        }
        log.finalize(
            FeedbackCode::Succeeded,
            vec![],
            helpful.iter().map(|t| TheoremId(*t)).collect(),
        );
        log
    }

    #[test]
    fn test_theorem_score_is_helpful_over_total() {
        let snapshot = sample_snapshot();
        let logs = vec![
            log_with(&[(1, 1), (2, 1)], &[2]),
            log_with(&[(1, 1)], &[2, 4]),
            log_with(&[(1, 1)], &[]),
            log_with(&[(1, 1)], &[]),
        ];

        let records = TheoremScoreCalibrator.calibrate(&snapshot, &logs);
        let score = |q: u32, a: u32, th: u32| {
            records
                .iter()
                .find(|r| r.key == (QuestionId(q), AnswerId(a), TheoremId(th)))
                .map(|r| r.score)
        };

        assert_eq!(score(1, 1, 2), Some(0.5));
        assert_eq!(score(1, 1, 4), Some(0.25));
        assert_eq!(score(2, 1, 2), Some(1.0));
        assert_eq!(score(2, 1, 4), None);
    }

    #[test]
    fn test_repeated_helpful_theorem_scores_at_most_one() {
        let snapshot = sample_snapshot();
        let logs = vec![log_with(&[(1, 1)], &[2, 2])];

        let records = TheoremScoreCalibrator.calibrate(&snapshot, &logs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].helpful, 1);
        assert_eq!(records[0].score, 1.0);
    }

    #[test]
    fn test_unknown_theorems_are_skipped() {
        let snapshot = sample_snapshot();
        let logs = vec![log_with(&[(1, 1)], &[404])];
        assert!(TheoremScoreCalibrator.calibrate(&snapshot, &logs).is_empty());
    }

    #[test]
    fn test_general_helpfulness_counts_sessions_once() {
        let snapshot = sample_snapshot();
        let logs = vec![
            log_with(&[(1, 1)], &[2, 2]),
            log_with(&[(1, 0)], &[3]),
            log_with(&[(1, 1)], &[]),
            log_with(&[(1, 1)], &[2]),
        ];

        let records = HelpfulnessCalibrator.calibrate(&snapshot, &logs);
        let value = |th: u32| {
            records
                .iter()
                .find(|r| r.theorem == TheoremId(th))
                .map(|r| r.value)
                .unwrap()
        };

        assert_eq!(value(2), 0.5);
        assert_eq!(value(3), 0.25);
        assert_eq!(value(1), 0.0);
        assert_eq!(records.len(), snapshot.theorems().count());
    }

    #[test]
    fn test_general_helpfulness_without_sessions_is_empty() {
        let snapshot = sample_snapshot();
        assert!(HelpfulnessCalibrator.calibrate(&snapshot, &[]).is_empty());
    }
}
