//! Per-session state: the uploaded image and the chat transcript.
//!
//! Sessions are created on demand, keyed by UUID, and swept after a period
//! of inactivity. Each session carries its own lock, so a slow model call
//! only blocks further turns of that session. Within a session the
//! transcript is append-only; turns are never mutated, reordered or
//! truncated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::analysis::UploadedImage;
use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Everything one browser session owns. No state outlives the store entry.
#[derive(Debug, Default)]
pub struct SessionState {
    image: Option<UploadedImage>,
    transcript: Vec<ChatTurn>,
}

impl SessionState {
    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    /// A new upload replaces the previous one.
    pub fn set_image(&mut self, image: UploadedImage) {
        self.image = Some(image);
    }

    pub fn push_user(&mut self, content: &str) {
        self.transcript.push(ChatTurn {
            role: ChatRole::User,
            content: content.to_string(),
        });
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.transcript.push(ChatTurn {
            role: ChatRole::Assistant,
            content: content.to_string(),
        });
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }
}

struct SessionEntry {
    state: Arc<Mutex<SessionState>>,
    last_accessed: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            last_accessed: Instant::now(),
        }
    }
}

/// Owns all live sessions. The store lock is only held for map lookups;
/// handlers lock the returned session for the duration of an interaction,
/// so one session's model call never blocks another session or the sweep.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: Duration::from_secs(config.timeout_minutes * 60),
            max_sessions: config.max_sessions,
        }
    }

    /// Looks up an existing session, touching it.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(session_id).map(|entry| {
            entry.last_accessed = Instant::now();
            entry.state.clone()
        })
    }

    /// Returns an existing session (touching it) or creates a new one,
    /// evicting the oldest session when at capacity.
    pub async fn get_or_create(
        &self,
        session_id: Option<String>,
    ) -> (String, Arc<Mutex<SessionState>>) {
        let mut sessions = self.sessions.lock().await;

        if let Some(ref id) = session_id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_accessed = Instant::now();
                return (id.clone(), entry.state.clone());
            }
        }

        if sessions.len() >= self.max_sessions {
            if let Some(oldest_id) = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(id, _)| id.clone())
            {
                sessions.remove(&oldest_id);
                info!("Removed oldest session {} to make room", oldest_id);
            }
        }

        let new_id = uuid::Uuid::new_v4().to_string();
        let entry = SessionEntry::new();
        let state = entry.state.clone();
        sessions.insert(new_id.clone(), entry);
        info!("Created new session: {}", new_id);
        (new_id, state)
    }

    pub async fn cleanup_expired(&self) {
        let mut sessions = self.sessions.lock().await;
        let before_count = sessions.len();

        sessions.retain(|id, entry| {
            let expired = entry.last_accessed.elapsed() > self.timeout;
            if expired {
                debug!("Expiring session: {}", id);
            }
            !expired
        });

        let removed = before_count - sessions.len();
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
