//! Summary statistics over stored sessions

use crate::error::Result;
use crate::session::{InteractionLog, SessionStore};
use crate::types::{FeedbackCode, TheoremId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: usize,

    /// Session count per feedback code; every code 4..=7 is present
    pub feedback: BTreeMap<u8, usize>,

    pub average_interactions: f64,

    pub sessions_with_triangle_types: usize,

    /// Sessions listing each theorem as helpful
    pub helpful_theorems: BTreeMap<TheoremId, usize>,
}

impl SessionStats {
    pub fn from_logs(logs: &[InteractionLog]) -> Self {
        let mut feedback: BTreeMap<u8, usize> =
            FeedbackCode::ALL.iter().map(|code| (code.code(), 0)).collect();
        let mut helpful_theorems = BTreeMap::new();
        let mut interactions = 0;
        let mut with_triangles = 0;

        for log in logs {
            if let Some(code) = log.feedback {
                *feedback.entry(code.code()).or_default() += 1;
            }
            interactions += log.len();
            if !log.triangle_types.is_empty() {
                with_triangles += 1;
            }

            let mut listed = log.helpful_theorems.clone();
            listed.sort();
            listed.dedup();
            for theorem in listed {
                *helpful_theorems.entry(theorem).or_default() += 1;
            }
        }

        let average_interactions = if logs.is_empty() {
            0.0
        } else {
            interactions as f64 / logs.len() as f64
        };

        Self {
            total_sessions: logs.len(),
            feedback,
            average_interactions,
            sessions_with_triangle_types: with_triangles,
            helpful_theorems,
        }
    }

    pub async fn collect(store: &dyn SessionStore) -> Result<Self> {
        let logs = store.load_all().await?;
        Ok(Self::from_logs(&logs))
    }
}
