use crate::error::StoreError;
use crate::session::store::{Slot, SlotStore};
use crate::session::{Message, SavedSession, SessionId, SessionSummary};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Named snapshots of past conversations. Each entry owns its own copy of the
/// messages, so later edits to the active sequence never reach it.
#[derive(Debug)]
pub struct SessionManager {
    store: SlotStore,
    sessions: Vec<SavedSession>,
}

impl SessionManager {
    pub fn restore(store: SlotStore) -> Self {
        let sessions: Vec<SavedSession> = store
            .read_json::<Vec<SavedSession>>(Slot::SavedChats)
            .unwrap_or_default()
            .into_iter()
            .map(|mut session| {
                session.messages = session.messages.into_iter().map(Message::sanitized).collect();
                session
            })
            .collect();
        info!(count = sessions.len(), "restored saved chats");
        let manager = Self { store, sessions };
        // Entries written before ids existed just received fresh ones.
        if !manager.is_empty() {
            if let Err(err) = manager.persist() {
                warn!("failed to rewrite saved chats: {err}");
            }
        }
        manager
    }

    pub fn save(&mut self, title: impl Into<String>, messages: &[Message]) -> Result<SessionId, StoreError> {
        let id = Uuid::new_v4();
        self.sessions.push(SavedSession {
            id,
            title: title.into(),
            created_at: Some(Utc::now()),
            messages: messages.to_vec(),
        });
        self.persist()?;
        Ok(id)
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|session| SessionSummary {
                id: session.id,
                title: session.title.clone(),
                created_at: session.created_at,
                message_count: session.messages.len(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn load(&self, id: SessionId) -> Option<Vec<Message>> {
        self.position(id).and_then(|index| self.load_at(index))
    }

    pub fn load_at(&self, index: usize) -> Option<Vec<Message>> {
        self.sessions.get(index).map(|session| session.messages.clone())
    }

    /// Returns `Ok(false)` when no entry has `id`.
    pub fn delete(&mut self, id: SessionId) -> Result<bool, StoreError> {
        match self.position(id) {
            Some(index) => self.delete_at(index),
            None => Ok(false),
        }
    }

    /// Removes the entry at `index`; later entries shift down by one.
    pub fn delete_at(&mut self, index: usize) -> Result<bool, StoreError> {
        if index >= self.sessions.len() {
            return Ok(false);
        }
        let removed = self.sessions.remove(index);
        info!(id = %removed.id, title = %removed.title, "deleted saved chat");
        self.persist()?;
        Ok(true)
    }

    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|session| session.id == id)
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.write_json(Slot::SavedChats, &self.sessions)
    }
}
