//! Session-keyed tutor service.
//!
//! Wraps a [`Tutor`] for callers that address sessions by id. Each session
//! sits behind its own async mutex, so operations on one session run one at a
//! time while different sessions proceed independently. Closed sessions are
//! handed to the [`SessionStore`]; closed and abandoned sessions leave the map.

use crate::calibration::{run_calibration, CalibrationJob, CalibrationOutcome};
use crate::engine::RankedTheorem;
use crate::error::{Result, TutorError};
use crate::session::{Session, SessionEnd, SessionStore};
use crate::tutor::{AnswerOutcome, Tutor};
use crate::types::{AnswerId, Question, QuestionId, SessionId, TheoremId, TriangleId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct TutorService {
    tutor: Tutor,
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>>,
    store: Arc<dyn SessionStore>,
}

impl TutorService {
    pub fn new(tutor: Tutor, store: Arc<dyn SessionStore>) -> Self {
        Self {
            tutor,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
        }
    }

    pub fn tutor(&self) -> &Tutor {
        &self.tutor
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn start_session(&self) -> SessionId {
        let session = self.tutor.start_session();
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        debug!("Started session {}", id);
        id
    }

    /// Number of sessions currently open
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn session(&self, id: SessionId) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TutorError::NotFound(format!("session {}", id)))
    }

    async fn remove(&self, id: SessionId) {
        self.sessions.write().await.remove(&id);
    }

    pub async fn first_question(&self, id: SessionId) -> Result<Question> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.tutor.first_question(&mut session)
    }

    pub async fn next_question(&self, id: SessionId) -> Result<Question> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.tutor.next_question(&mut session)
    }

    pub async fn submit_answer(
        &self,
        id: SessionId,
        question: QuestionId,
        answer: AnswerId,
    ) -> Result<AnswerOutcome> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.tutor.submit_answer(&mut session, question, answer)
    }

    pub async fn rank_theorems(
        &self,
        id: SessionId,
        question: Option<QuestionId>,
        answer: Option<AnswerId>,
        threshold: Option<f64>,
    ) -> Result<Vec<RankedTheorem>> {
        let session = self.session(id).await?;
        let session = session.lock().await;
        self.tutor.rank_theorems(&session, question, answer, threshold)
    }

    /// End a session; a closed session's log is saved before this returns.
    ///
    /// If the save fails the session stays open and untouched, so the
    /// caller can retry.
    pub async fn end_session(
        &self,
        id: SessionId,
        feedback: u8,
        triangle_types: Vec<TriangleId>,
        helpful_theorems: Vec<TheoremId>,
        persist: bool,
    ) -> Result<SessionEnd> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;

        // Closing only takes effect once the log is stored
        let mut ending = session.clone();
        let end = self.tutor.end_session(
            &mut ending,
            feedback,
            triangle_types,
            helpful_theorems,
            persist,
        )?;

        if let SessionEnd::Closed(log) = &end {
            self.store.save(log).await.inspect_err(|e| {
                warn!("Failed to save session {}, keeping it open: {}", id, e);
            })?;
            info!("Session {} saved", id);
        }

        *session = ending;
        match &end {
            SessionEnd::Closed(_) | SessionEnd::Abandoned => self.remove(id).await,
            SessionEnd::Resume => {}
        }
        Ok(end)
    }

    /// Drop a session without saving it
    pub async fn abandon(&self, id: SessionId) -> Result<()> {
        let handle = self.session(id).await?;
        handle.lock().await.abandon()?;
        self.remove(id).await;
        Ok(())
    }

    /// Recalibrate the shared knowledge from every stored session
    pub async fn calibrate(&self, jobs: &[Box<dyn CalibrationJob>]) -> Result<CalibrationOutcome> {
        run_calibration(self.tutor.knowledge(), self.store.as_ref(), jobs).await
    }
}
