//! Single-use slot that passes a source image from the launcher to the editor.

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StorageError, StorageResult};

pub const HANDOFF_STORAGE_KEY: &str = "editorData";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffPayload {
    pub image_data: String,
    pub file_name: String,
    pub timestamp: u64,
}

#[derive(Debug)]
pub struct HandoffChannel<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HandoffChannel<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Queues a payload for the next editor boot, replacing any pending one.
    pub fn stash(&self, payload: &HandoffPayload) -> StorageResult<()> {
        let raw = serde_json::to_string(payload).map_err(|source| StorageError::Encode {
            key: HANDOFF_STORAGE_KEY.to_string(),
            source,
        })?;
        self.store.set(HANDOFF_STORAGE_KEY, &raw)
    }

    /// Consumes the pending payload. The slot is cleared even when the payload
    /// is corrupt; an empty or unreadable slot yields `None`.
    pub fn take(&self) -> Option<HandoffPayload> {
        let raw = match self.store.get(HANDOFF_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(?err, "failed to read editor handoff slot");
                return None;
            }
        };

        if let Err(err) = self.store.remove(HANDOFF_STORAGE_KEY) {
            tracing::warn!(?err, "failed to clear editor handoff slot after read");
        }

        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!(?err, "discarding corrupt editor handoff payload");
                None
            }
        }
    }
}
