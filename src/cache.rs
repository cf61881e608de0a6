//! Keyed in-memory cache for conversation data
//!
//! Holds contact lists per instance and message windows per
//! (instance, contact) pair. All mutation goes through whole-entry
//! replacement under a short-lived lock, so concurrent fetch completions
//! never observe a partially updated entry. Entries are never evicted;
//! the dataset is bounded by one organization's instances and contacts.

use crate::error::{Error, Result};
use crate::model::{Contact, ConversationKey, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Cached contact list for one instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCacheEntry {
    pub contacts: Vec<Contact>,
    /// None until the first successful fetch
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Cached message window for one (instance, contact) pair
///
/// Invariants: `messages` is non-decreasing by timestamp and contains no
/// duplicate ids. Both are maintained by the merge in `pagination`.
#[derive(Debug, Clone, Default)]
pub struct MessageCacheEntry {
    pub messages: Vec<Message>,
    /// Cursor for the page older than the oldest loaded message
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Guard against duplicate older-page fetches; set before the
    /// transport call is awaited
    pub is_loading_more: bool,
}

/// In-memory cache for contacts and message windows
///
/// One instance per session; share via `Arc`. The contact side can be
/// snapshotted to disk and reloaded at process boundaries.
pub struct ConversationCache {
    contacts: Mutex<HashMap<String, ContactCacheEntry>>,
    messages: Mutex<HashMap<ConversationKey, MessageCacheEntry>>,
    /// Per-conversation generation counters; a fetch whose generation no
    /// longer matches on completion is dropped as stale
    generations: Mutex<HashMap<ConversationKey, u64>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self {
            contacts: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached contact list for an instance
    pub fn contacts(&self, instance_id: &str) -> Option<ContactCacheEntry> {
        self.contacts.lock().unwrap().get(instance_id).cloned()
    }

    /// Replace the contact entry for an instance
    pub fn set_contacts(&self, instance_id: &str, entry: ContactCacheEntry) {
        self.contacts
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), entry);
    }

    pub fn has_contacts(&self, instance_id: &str) -> bool {
        self.contacts.lock().unwrap().contains_key(instance_id)
    }

    /// Get the cached message window for a conversation
    pub fn messages(&self, key: &ConversationKey) -> Option<MessageCacheEntry> {
        self.messages.lock().unwrap().get(key).cloned()
    }

    /// Replace the message entry for a conversation
    pub fn set_messages(&self, key: &ConversationKey, entry: MessageCacheEntry) {
        self.messages.lock().unwrap().insert(key.clone(), entry);
    }

    pub fn has_messages(&self, key: &ConversationKey) -> bool {
        self.messages.lock().unwrap().contains_key(key)
    }

    /// Atomically read-modify-replace a message entry. Returns false if no
    /// entry exists for the key.
    pub fn update_messages<F>(&self, key: &ConversationKey, f: F) -> bool
    where
        F: FnOnce(&mut MessageCacheEntry),
    {
        let mut map = self.messages.lock().unwrap();
        match map.get(key) {
            Some(entry) => {
                let mut updated = entry.clone();
                f(&mut updated);
                map.insert(key.clone(), updated);
                true
            }
            None => false,
        }
    }

    /// Current generation for a conversation (0 if never opened)
    pub fn generation(&self, key: &ConversationKey) -> u64 {
        self.generations.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Bump and return the generation for a conversation, invalidating any
    /// in-flight fetch started under the previous one
    pub fn bump_generation(&self, key: &ConversationKey) -> u64 {
        let mut map = self.generations.lock().unwrap();
        let gen = map.entry(key.clone()).or_insert(0);
        *gen += 1;
        *gen
    }

    /// Load the contact snapshot from disk, replacing the in-memory map.
    /// A missing file is not an error (fresh session).
    pub fn load_snapshot(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Ok(0);
        }

        let content = fs::read_to_string(path)?;
        let map: HashMap<String, ContactCacheEntry> = serde_json::from_str(&content)?;
        let count = map.len();
        *self.contacts.lock().unwrap() = map;
        Ok(count)
    }

    /// Save the contact snapshot to disk atomically
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file in same directory (for atomic rename)
        let parent = path.parent().unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;

        let json = {
            let map = self.contacts.lock().unwrap();
            serde_json::to_string_pretty(&*map)?
        };
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }
}

impl Default for ConversationCache {
    fn default() -> Self {
        Self::new()
    }
}
