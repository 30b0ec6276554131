//! Per-connection interview state.
//!
//! Each connected client gets one [`InterviewSession`], created on its first
//! message and dropped on disconnect. Handlers share a [`SessionStore`] by
//! cloning it; there is no process-wide session state.

use crate::error::{Result, VisageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Interviewer,
    Candidate,
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            role: Role::Candidate,
            text: text.into(),
        }
    }
}

/// State owned by one connected client.
#[derive(Debug, Clone, Default)]
pub struct InterviewSession {
    /// Job position the candidate is interviewing for.
    pub position: String,
    pub history: Vec<Turn>,
    audio: Vec<u8>,
}

impl InterviewSession {
    pub fn new(position: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            ..Self::default()
        }
    }

    /// Bytes of candidate audio buffered since the last take.
    pub fn buffered_audio(&self) -> usize {
        self.audio.len()
    }
}

/// Session-keyed store shared by request handlers.
///
/// Cheap to clone; all clones see the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, InterviewSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `id` if none exists.
    ///
    /// Returns `true` when a new session was created. An existing session
    /// keeps its position and history.
    pub async fn open(&self, id: &str, position: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return false;
        }
        sessions.insert(id.to_owned(), InterviewSession::new(position));
        debug!(session = id, position, "session opened");
        true
    }

    /// Record a turn in the conversation history.
    pub async fn append_turn(&self, id: &str, turn: Turn) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        session.history.push(turn);
        Ok(())
    }

    /// Append streamed audio. Returns the buffered length.
    pub async fn push_audio_chunk(&self, id: &str, chunk: &[u8]) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        session.audio.extend_from_slice(chunk);
        Ok(session.audio.len())
    }

    /// Drain the audio buffer, leaving it empty.
    pub async fn take_audio(&self, id: &str) -> Result<Vec<u8>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        Ok(std::mem::take(&mut session.audio))
    }

    /// Snapshot of the conversation so far.
    pub async fn history(&self, id: &str) -> Result<Vec<Turn>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.history.clone())
            .ok_or_else(|| not_found(id))
    }

    pub async fn position(&self, id: &str) -> Result<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.position.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Tear down the session for `id`, returning its final state.
    pub async fn close(&self, id: &str) -> Option<InterviewSession> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            debug!(session = id, "session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn not_found(id: &str) -> VisageError {
    VisageError::Session(format!("session not found: {id}"))
}
