use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::welcome_message;
use crate::models::{
    ActionItem, AssessmentAnswers, ChatMessage, CompletionResult, Message, Role,
};

/// Conversation state owned by one front-end session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub answers: AssessmentAnswers,
    pub messages: Vec<Message>,
    pub action_items: Vec<ActionItem>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Starts a session seeded with the assistant's welcome message.
    pub fn start(answers: AssessmentAnswers, now: DateTime<Utc>) -> Self {
        let welcome = Message::new(Role::Assistant, welcome_message(&answers), now);
        Self {
            answers,
            messages: vec![welcome],
            action_items: Vec::new(),
            updated_at: now,
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat_message).collect()
    }

    pub fn push_user(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        self.messages.push(Message::new(Role::User, content, now));
        self.updated_at = now;
    }

    pub fn push_assistant(&mut self, result: CompletionResult, now: DateTime<Utc>) {
        self.messages
            .push(Message::new(Role::Assistant, result.message, now));
        for item in result.progress_items {
            // Fallback items have fixed ids; keep the first copy.
            if !self.action_items.iter().any(|existing| existing.id == item.id) {
                self.action_items.push(item);
            }
        }
        self.updated_at = now;
    }

    /// Flips `completed` on the item with `id`. Returns false if no item matches.
    pub fn toggle_item(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.action_items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.completed = !item.completed;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.action_items.iter().filter(|item| item.completed).count()
    }

    /// Drops the transcript and items and greets again with the same answers.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::start(self.answers.clone(), now);
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Storage backend for a single chat session. Callers load at startup and
/// save after every mutation.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<ChatSession>, SessionStoreError>;
    fn save(&self, session: &ChatSession) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<ChatSession>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::Read {
                    path: self.display_path(),
                    source,
                });
            }
        };

        serde_json::from_str::<ChatSession>(&raw)
            .map(Some)
            .map_err(|source| SessionStoreError::Decode {
                path: self.display_path(),
                source,
            })
    }

    fn save(&self, session: &ChatSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionStoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let encoded = serde_json::to_string_pretty(session).map_err(SessionStoreError::Encode)?;
        fs::write(&self.path, encoded).map_err(|source| SessionStoreError::Write {
            path: self.display_path(),
            source,
        })
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Write {
                path: self.display_path(),
                source,
            }),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<ChatSession>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<ChatSession>, SessionStoreError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, session: &ChatSession) -> Result<(), SessionStoreError> {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}
