//! Offline calibration: recompute learned knowledge from stored sessions.
//!
//! Each job reads the current snapshot and every stored log and produces a
//! [`CalibrationUpdate`]. [`run_calibration`] applies all updates to one new
//! snapshot and swaps it in once, so open sessions move from the old
//! knowledge to the new without seeing a half-applied state.

mod multipliers;
mod theorem_scores;

pub use multipliers::{MultiplierCalibrator, MultiplierCounts};
pub use theorem_scores::{HelpfulnessCalibrator, TheoremScoreCalibrator};

use crate::config::CalibrationConfig;
use crate::error::Result;
use crate::knowledge::{
    KnowledgeSnapshot, MultiplierKey, SharedKnowledge, SqliteKnowledgeSource, TheoremScoreKey,
};
use crate::session::{InteractionLog, SessionStore};
use crate::types::TheoremId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A recalibrated Dynamic multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicMultiplierRecord {
    pub key: MultiplierKey,
    pub multiplier: f64,
    /// Interactions with this (question, answer) in sessions that had triangle types
    pub sessions: u64,
    /// Of those, how many listed this triangle
    pub sessions_with_triangle: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoremScoreRecord {
    pub key: TheoremScoreKey,
    pub total: u64,
    pub helpful: u64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpfulnessRecord {
    pub theorem: TheoremId,
    pub helpful_sessions: u64,
    pub value: f64,
}

/// Output of one calibration job
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationUpdate {
    Multipliers(Vec<DynamicMultiplierRecord>),
    TheoremScores(Vec<TheoremScoreRecord>),
    Helpfulness(Vec<HelpfulnessRecord>),
}

impl CalibrationUpdate {
    pub fn len(&self) -> usize {
        match self {
            Self::Multipliers(records) => records.len(),
            Self::TheoremScores(records) => records.len(),
            Self::Helpfulness(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of `snapshot` with this update applied
    pub fn apply(&self, snapshot: &KnowledgeSnapshot) -> Result<KnowledgeSnapshot> {
        match self {
            Self::Multipliers(records) => snapshot.with_dynamic_multipliers(
                records.iter().map(|r| (r.key, r.multiplier)).collect(),
            ),
            Self::TheoremScores(records) => Ok(snapshot
                .with_theorem_scores(records.iter().map(|r| (r.key, r.score)).collect())),
            Self::Helpfulness(records) => {
                let values: HashMap<TheoremId, f64> =
                    records.iter().map(|r| (r.theorem, r.value)).collect();
                Ok(snapshot.with_general_helpfulness(&values))
            }
        }
    }

    /// Write this update to the knowledge database
    pub async fn persist(&self, source: &SqliteKnowledgeSource) -> Result<()> {
        match self {
            Self::Multipliers(records) => source.store_dynamic_multipliers(records.clone()).await,
            Self::TheoremScores(records) => source.store_theorem_scores(records.clone()).await,
            Self::Helpfulness(records) => source.store_general_helpfulness(records.clone()).await,
        }
    }
}

/// A batch job that recomputes part of the knowledge from session logs
#[async_trait]
pub trait CalibrationJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        knowledge: &KnowledgeSnapshot,
        logs: &[InteractionLog],
    ) -> Result<CalibrationUpdate>;
}

/// Report generated after a calibration job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub job: String,

    /// Number of session logs read
    pub sessions_processed: usize,

    /// Number of records produced
    pub records: usize,

    #[serde(with = "serde_duration_millis")]
    pub duration: Duration,
}

mod serde_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Result of a full calibration run
#[derive(Debug)]
pub struct CalibrationOutcome {
    pub reports: Vec<CalibrationReport>,
    pub updates: Vec<CalibrationUpdate>,
}

/// Dynamic multipliers, theorem scores and general helpfulness, in that order
pub fn default_jobs(config: &CalibrationConfig) -> Vec<Box<dyn CalibrationJob>> {
    vec![
        Box::new(MultiplierCalibrator::new(config.clone())),
        Box::new(TheoremScoreCalibrator),
        Box::new(HelpfulnessCalibrator),
    ]
}

/// Run `jobs` over every stored session and swap the result into `knowledge`.
///
/// All jobs see the same starting snapshot. If any job fails nothing is
/// swapped. With no stored sessions there is nothing to learn from, so no
/// job runs and the knowledge is left as it is.
pub async fn run_calibration(
    knowledge: &SharedKnowledge,
    sessions: &dyn SessionStore,
    jobs: &[Box<dyn CalibrationJob>],
) -> Result<CalibrationOutcome> {
    let logs = sessions.load_all().await?;
    if logs.is_empty() {
        warn!("No stored sessions; calibration skipped");
        return Ok(CalibrationOutcome {
            reports: Vec::new(),
            updates: Vec::new(),
        });
    }

    let current = knowledge.snapshot();
    info!(
        "Calibrating from {} stored sessions with {} jobs",
        logs.len(),
        jobs.len()
    );

    let mut reports = Vec::with_capacity(jobs.len());
    let mut updates = Vec::with_capacity(jobs.len());
    let mut next: KnowledgeSnapshot = (*current).clone();

    for job in jobs {
        let started = Instant::now();
        let update = job.run(&current, &logs).await.inspect_err(|e| {
            warn!("Calibration job {} failed: {}", job.name(), e);
        })?;
        next = update.apply(&next)?;

        let report = CalibrationReport {
            job: job.name().to_string(),
            sessions_processed: logs.len(),
            records: update.len(),
            duration: started.elapsed(),
        };
        info!(
            "Job {} produced {} records in {:?}",
            report.job, report.records, report.duration
        );
        reports.push(report);
        updates.push(update);
    }

    knowledge.swap(next);
    Ok(CalibrationOutcome { reports, updates })
}
