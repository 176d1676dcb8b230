//! Per-chat conversation state.
//!
//! Sessions are created on first access and live until the process exits.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

pub use provider_core::SynthesisSettings;

pub type ChatId = i64;

/// Which free-text input a session is waiting for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingVoiceId,
    AwaitingSettings,
    AwaitingText,
}

/// Reference to the last generated clip, enough to delete it upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastArtifact {
    pub history_item_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub voice_id: Option<String>,
    pub settings: SynthesisSettings,
    pub state: SessionState,
    pub last_artifact: Option<LastArtifact>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the session for `chat_id`, creating it if needed.
    pub fn get(&self, chat_id: ChatId) -> Session {
        self.sessions.entry(chat_id).or_default().clone()
    }

    /// Mutate the session for `chat_id` in place, creating it if needed.
    ///
    /// The closure runs while the entry is locked; do not call back into the
    /// store from inside it.
    pub fn update<R>(&self, chat_id: ChatId, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut entry = self.sessions.entry(chat_id).or_default();
        f(entry.value_mut())
    }

    pub fn state(&self, chat_id: ChatId) -> SessionState {
        self.sessions
            .get(&chat_id)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    pub fn set_state(&self, chat_id: ChatId, state: SessionState) {
        self.update(chat_id, |s| s.state = state);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
