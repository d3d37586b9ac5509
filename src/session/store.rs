use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Named persisted values. Each slot is a single file under the store root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ChatHistory,
    SavedChats,
    Theme,
    Background,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Slot::ChatHistory => "chat_history",
            Slot::SavedChats => "saved_chats",
            Slot::Theme => "theme",
            Slot::Background => "background",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlotStore {
    root: PathBuf,
}

impl SlotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, slot: Slot) -> PathBuf {
        self.root.join(format!("{}.json", slot.key()))
    }

    pub fn read(&self, slot: Slot) -> Option<String> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(slot = slot.key(), "failed to read {}: {err}", path.display());
                None
            }
        }
    }

    /// Parses a slot as JSON. Missing, blank, or malformed contents all yield
    /// `None`.
    pub fn read_json<T: DeserializeOwned>(&self, slot: Slot) -> Option<T> {
        let contents = self.read(slot)?;
        if contents.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(slot = slot.key(), "discarding malformed slot contents: {err}");
                None
            }
        }
    }

    pub fn write(&self, slot: Slot, contents: &str) -> Result<(), StoreError> {
        let final_path = self.slot_path(slot);
        let write_err = |source| StoreError::Write {
            path: final_path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(write_err)?;
        let tmp_path = self.root.join(format!("{}.json.tmp", slot.key()));
        fs::write(&tmp_path, contents).map_err(write_err)?;

        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => {}
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path).map_err(write_err)?;
                    fs::rename(&tmp_path, &final_path).map_err(write_err)?;
                } else {
                    return Err(write_err(rename_err));
                }
            }
        }
        debug!(slot = slot.key(), bytes = contents.len(), "slot written");
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, slot: Slot, value: &T) -> Result<(), StoreError> {
        let contents = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            slot: slot.key(),
            source,
        })?;
        self.write(slot, &contents)
    }

    pub fn remove(&self, slot: Slot) -> Result<(), StoreError> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }
}
