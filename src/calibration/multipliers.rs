// Dynamic Multiplier Calibration
//
// Moves each Initial multiplier toward the rate observed in stored sessions:
// - empirical = sessions where (q, a) co-occurred with triangle t / sessions with (q, a)
// - target    = max(1, empirical * scale) for boosting baselines (> 1)
//             = min(1, empirical * scale) for damping baselines (< 1)
// - updated   = baseline + alpha * (target - baseline)
//
// Only sessions that name at least one triangle type are counted. Neutral
// (1) and eliminating (0) baselines are never calibrated.

use super::{CalibrationJob, CalibrationUpdate, DynamicMultiplierRecord};
use crate::config::CalibrationConfig;
use crate::error::Result;
use crate::knowledge::{KnowledgeSnapshot, MultiplierKey};
use crate::session::InteractionLog;
use crate::types::{AnswerId, QuestionId, TriangleId};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Observation counts gathered from stored sessions
#[derive(Debug, Default)]
pub struct MultiplierCounts {
    /// (question, answer) → interactions in sessions with triangle types
    pub total: HashMap<(QuestionId, AnswerId), u64>,
    /// (question, answer, triangle) → interactions in sessions listing that triangle
    pub with_triangle: HashMap<MultiplierKey, u64>,
}

impl MultiplierCounts {
    pub fn from_logs(logs: &[InteractionLog]) -> Self {
        let mut counts = Self::default();
        for log in logs.iter().filter(|l| !l.triangle_types.is_empty()) {
            let listed: BTreeSet<TriangleId> = log.triangle_types.iter().copied().collect();
            for (question, answer) in log.pairs() {
                *counts.total.entry((question, answer)).or_default() += 1;
                for triangle in &listed {
                    *counts
                        .with_triangle
                        .entry((question, answer, *triangle))
                        .or_default() += 1;
                }
            }
        }
        counts
    }
}

/// Recalibrates the Dynamic multiplier tier from session history
pub struct MultiplierCalibrator {
    config: CalibrationConfig,
}

impl MultiplierCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// One calibration step for a single multiplier.
    ///
    /// Returns `None` when the baseline is 0 or 1, or there are fewer than
    /// `min_observations` observations.
    pub fn calibrate_one(&self, baseline: f64, total: u64, with_triangle: u64) -> Option<f64> {
        if baseline == 0.0 || baseline == 1.0 || total < self.config.min_observations {
            return None;
        }

        let empirical = with_triangle as f64 / total as f64;
        let scaled = empirical * self.config.scale;
        let target = if baseline > 1.0 {
            scaled.max(1.0)
        } else {
            scaled.min(1.0)
        };

        let updated = baseline + self.config.alpha * (target - baseline);
        if empirical >= 1.0 && updated < baseline {
            // A perfect co-occurrence never weakens a multiplier
            return Some(baseline);
        }
        Some(updated)
    }

    /// New Dynamic tier: recalibrated records plus untouched existing ones
    pub fn calibrate(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Vec<DynamicMultiplierRecord> {
        let counts = MultiplierCounts::from_logs(logs);
        let mut records: HashMap<MultiplierKey, DynamicMultiplierRecord> = knowledge
            .multipliers()
            .dynamic()
            .iter()
            .map(|(key, multiplier)| {
                (
                    *key,
                    DynamicMultiplierRecord {
                        key: *key,
                        multiplier: *multiplier,
                        sessions: 0,
                        sessions_with_triangle: 0,
                    },
                )
            })
            .collect();

        let mut recalibrated = 0;
        for (key, baseline) in knowledge.multipliers().initial() {
            let (question, answer, _) = *key;
            let Some(&with_triangle) = counts.with_triangle.get(key) else {
                continue;
            };
            let total = counts.total.get(&(question, answer)).copied().unwrap_or(0);

            if let Some(updated) = self.calibrate_one(*baseline, total, with_triangle) {
                records.insert(
                    *key,
                    DynamicMultiplierRecord {
                        key: *key,
                        multiplier: updated,
                        sessions: total,
                        sessions_with_triangle: with_triangle,
                    },
                );
                recalibrated += 1;
            }
        }

        debug!(
            "Recalibrated {} of {} initial multipliers",
            recalibrated,
            knowledge.multipliers().initial().len()
        );

        let mut records: Vec<DynamicMultiplierRecord> = records.into_values().collect();
        records.sort_by_key(|r| r.key);
        records
    }
}

#[async_trait]
impl CalibrationJob for MultiplierCalibrator {
    fn name(&self) -> &str {
        "dynamic_multipliers"
    }

    async fn run(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Result<CalibrationUpdate> {
        Ok(CalibrationUpdate::Multipliers(self.calibrate(knowledge, logs)))
    }
}
