//! Conversation service - ties cache, staleness, pagination and scroll
//! anchoring together
//!
//! One instance per session, shared via `Arc`. All fetches go through the
//! transport trait; per-key admission control (the `is_loading_more` flag
//! and the background-refresh marker) lives here.

use crate::cache::{ContactCacheEntry, ConversationCache, MessageCacheEntry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Contact, ConversationKey, Direction, Message, MessageStatus};
use crate::pagination::{append_message, merge_older, reconcile_placeholder};
use crate::scroll::{
    should_fetch_older, ScrollAdjustment, ScrollAnchor, ScrollMetrics, SeparatorPosition,
};
use crate::staleness::{should_block_fetch, InFlightSet};
use crate::transport::ConversationTransport;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a contact-list request
#[derive(Debug, Clone)]
pub enum ContactFetch {
    /// Fetched synchronously (no cache, or cache past the threshold)
    Fresh(Vec<Contact>),
    /// Served from cache; a background revalidation may have been scheduled
    Cached(Vec<Contact>),
}

impl ContactFetch {
    pub fn contacts(&self) -> &[Contact] {
        match self {
            ContactFetch::Fresh(c) | ContactFetch::Cached(c) => c,
        }
    }
}

/// Outcome of an initial-page request
#[derive(Debug, Clone, PartialEq)]
pub enum InitialFetch {
    /// Most recent page loaded and cached
    Loaded(Vec<Message>),
    /// A newer load for the same conversation won the race; nothing was
    /// cached and the fetched page must not be rendered
    Superseded,
}

impl InitialFetch {
    pub fn messages(&self) -> &[Message] {
        match self {
            InitialFetch::Loaded(m) => m,
            InitialFetch::Superseded => &[],
        }
    }
}

/// Outcome of an older-page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlderFetch {
    /// Page merged; carries the number of new messages after dedup
    Loaded(usize),
    /// Guard rejected the request (no more pages, or a fetch already
    /// running, or the scroll position does not qualify)
    Skipped,
    /// The response arrived after the conversation was reloaded and was
    /// dropped
    Superseded,
}

/// Session-scoped conversation data layer
pub struct ConversationService {
    config: Config,
    cache: Arc<ConversationCache>,
    transport: Arc<dyn ConversationTransport>,
    refreshing: Arc<InFlightSet>,
    active: Mutex<Option<ConversationKey>>,
    anchor: Mutex<ScrollAnchor>,
}

impl ConversationService {
    pub fn new(config: Config, transport: Arc<dyn ConversationTransport>) -> Self {
        Self {
            config,
            cache: Arc::new(ConversationCache::new()),
            transport,
            refreshing: Arc::new(InFlightSet::new()),
            active: Mutex::new(None),
            anchor: Mutex::new(ScrollAnchor::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the contact snapshot written by a previous session
    pub fn load_snapshot(&self) -> Result<usize> {
        let count = self.cache.load_snapshot(&self.config.snapshot_file)?;
        if count > 0 {
            info!(instances = count, "loaded contact snapshot");
        }
        Ok(count)
    }

    /// Persist the contact cache for the next session
    pub fn save_snapshot(&self) -> Result<()> {
        self.cache.save_snapshot(&self.config.snapshot_file)
    }

    // ------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------

    /// Contact list for an instance, stale-while-revalidate.
    ///
    /// Blocks on the transport only when nothing usable is cached; a
    /// fresh-enough cache is returned immediately and silently revalidated
    /// in the background. Only the blocking path surfaces errors.
    pub async fn fetch_all_contacts(&self, instance_id: &str) -> Result<ContactFetch> {
        let now = Utc::now();
        let entry = self.cache.contacts(instance_id);
        let last_fetched = entry.as_ref().and_then(|e| e.last_fetched_at);

        if should_block_fetch(last_fetched, now, self.config.contacts_stale_ms) {
            debug!(instance = instance_id, "contact cache stale, blocking fetch");
            let contacts = self.transport.fetch_contacts(instance_id).await?;
            self.cache.set_contacts(
                instance_id,
                ContactCacheEntry {
                    contacts: contacts.clone(),
                    last_fetched_at: Some(Utc::now()),
                },
            );
            return Ok(ContactFetch::Fresh(contacts));
        }

        // last_fetched was Some, so the entry exists
        let cached = entry.map(|e| e.contacts).unwrap_or_default();
        self.spawn_contact_refresh(instance_id);
        Ok(ContactFetch::Cached(cached))
    }

    /// Schedule a silent background revalidation unless one is already
    /// running for this instance
    fn spawn_contact_refresh(&self, instance_id: &str) {
        if !self.refreshing.try_begin(instance_id) {
            debug!(instance = instance_id, "refresh already in flight, skipping");
            return;
        }

        let instance = instance_id.to_string();
        let cache = Arc::clone(&self.cache);
        let transport = Arc::clone(&self.transport);
        let refreshing = Arc::clone(&self.refreshing);

        tokio::spawn(async move {
            match transport.fetch_contacts(&instance).await {
                Ok(contacts) => {
                    cache.set_contacts(
                        &instance,
                        ContactCacheEntry {
                            contacts,
                            last_fetched_at: Some(Utc::now()),
                        },
                    );
                    debug!(instance = %instance, "background contact refresh complete");
                }
                Err(e) => {
                    // keep the last-good data and the old timestamp, so
                    // the next check still sees the entry as aging
                    warn!(instance = %instance, error = %e, "background contact refresh failed");
                }
            }
            refreshing.finish(&instance);
        });
    }

    // ------------------------------------------------------------------
    // Active conversation & scroll anchoring
    // ------------------------------------------------------------------

    /// Switch the active conversation. The scroll anchor is reset here,
    /// and only here; skipping this on a contact switch leaks scroll
    /// state across conversations.
    pub fn set_active_conversation(&self, key: Option<ConversationKey>) {
        *self.active.lock().unwrap() = key;
        self.anchor.lock().unwrap().reset();
    }

    pub fn active_conversation(&self) -> Option<ConversationKey> {
        self.active.lock().unwrap().clone()
    }

    fn is_active(&self, key: &ConversationKey) -> bool {
        self.active.lock().unwrap().as_ref() == Some(key)
    }

    fn clear_pending_anchor(&self, key: &ConversationKey) {
        if self.is_active(key) {
            self.anchor.lock().unwrap().clear_pending_anchor();
        }
    }

    /// Scroll correction for a freshly laid-out list. Must be applied by
    /// the embedder before the next paint. Renders of conversations that
    /// are no longer active never move the viewport.
    pub fn on_list_rendered(
        &self,
        key: &ConversationKey,
        metrics: ScrollMetrics,
    ) -> ScrollAdjustment {
        if !self.is_active(key) {
            return ScrollAdjustment::None;
        }
        let messages = self
            .cache
            .messages(key)
            .map(|e| e.messages)
            .unwrap_or_default();
        self.anchor
            .lock()
            .unwrap()
            .on_list_rendered(&messages, metrics)
    }

    /// Recompute the pinned date label for the current scroll position
    pub fn on_scroll(
        &self,
        separators: &[SeparatorPosition],
        scroll_top: f64,
    ) -> Option<String> {
        self.anchor
            .lock()
            .unwrap()
            .track_pinned(separators, scroll_top)
            .map(|s| s.to_string())
    }

    pub fn pinned_label(&self) -> Option<String> {
        self.anchor.lock().unwrap().pinned_label().map(|s| s.to_string())
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Fetch the most recent page and fully replace the cache entry.
    ///
    /// Bumps the conversation's generation so an older in-flight fetch
    /// for the same key is dropped when it lands. A fetch that loses that
    /// race reports `Superseded` so the caller never renders a page the
    /// cache discarded.
    pub async fn fetch_initial(&self, key: &ConversationKey) -> Result<InitialFetch> {
        let generation = self.cache.bump_generation(key);

        let page = self
            .transport
            .fetch_messages(
                &key.instance_id,
                &key.contact_id,
                self.config.initial_page_size,
                None,
            )
            .await?;

        // sorts and dedupes the page in one pass
        let messages = merge_older(&[], page.messages);

        if self.cache.generation(key) != generation {
            debug!(conversation = %key, "initial fetch superseded, dropping");
            return Ok(InitialFetch::Superseded);
        }

        self.cache.set_messages(
            key,
            MessageCacheEntry {
                messages: messages.clone(),
                next_cursor: page.next_cursor,
                has_more: page.has_more,
                is_loading_more: false,
            },
        );
        debug!(conversation = %key, count = messages.len(), "initial page loaded");
        Ok(InitialFetch::Loaded(messages))
    }

    /// Older-page fetch driven by a scroll event near the container top.
    ///
    /// The `is_loading_more` flag is claimed atomically before the
    /// transport call is awaited; rapid scroll events therefore collapse
    /// into a single fetch without any debounce. A failed fetch releases
    /// the flag and leaves `has_more` and the loaded window untouched.
    pub async fn maybe_fetch_older(
        &self,
        key: &ConversationKey,
        metrics: ScrollMetrics,
    ) -> Result<OlderFetch> {
        let entry = self
            .cache
            .messages(key)
            .ok_or_else(|| Error::ConversationNotLoaded(key.contact_id.clone()))?;

        if !should_fetch_older(
            metrics,
            self.config.scroll_top_threshold_px,
            entry.has_more,
            entry.is_loading_more,
        ) {
            return Ok(OlderFetch::Skipped);
        }

        // claim the flag atomically; a concurrent caller that lost the
        // race sees is_loading_more already set and backs off
        let mut cursor = None;
        let mut claimed = false;
        self.cache.update_messages(key, |e| {
            if e.has_more && !e.is_loading_more {
                e.is_loading_more = true;
                claimed = true;
                cursor = e.next_cursor.clone();
            }
        });
        if !claimed {
            return Ok(OlderFetch::Skipped);
        }

        let generation = self.cache.generation(key);

        // remember the pre-prepend height so the render correction can
        // keep the viewport visually fixed
        if self.is_active(key) {
            self.anchor.lock().unwrap().note_before_prepend(metrics);
        }

        let page = match self
            .transport
            .fetch_messages(
                &key.instance_id,
                &key.contact_id,
                self.config.older_page_size,
                cursor.as_deref(),
            )
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.cache.update_messages(key, |entry| {
                    entry.is_loading_more = false;
                });
                // nothing was prepended, so the armed anchor must not
                // survive to the next render
                self.clear_pending_anchor(key);
                warn!(conversation = %key, error = %e, "older page fetch failed");
                return Err(e);
            }
        };

        if self.cache.generation(key) != generation {
            debug!(conversation = %key, "older page superseded, dropping");
            self.cache.update_messages(key, |entry| {
                entry.is_loading_more = false;
            });
            self.clear_pending_anchor(key);
            return Ok(OlderFetch::Superseded);
        }

        let mut added = 0;
        self.cache.update_messages(key, |entry| {
            let before = entry.messages.len();
            entry.messages = merge_older(&entry.messages, page.messages.clone());
            added = entry.messages.len() - before;
            entry.next_cursor = page.next_cursor.clone();
            entry.has_more = page.has_more;
            entry.is_loading_more = false;
        });

        debug!(conversation = %key, added, has_more = page.has_more, "older page merged");
        Ok(OlderFetch::Loaded(added))
    }

    /// Send a text message optimistically.
    ///
    /// A placeholder with `status = Sending` and a fresh `client_temp_id`
    /// is appended immediately; the backend's confirmed record replaces it
    /// when the send resolves. On failure the placeholder is removed and
    /// the error propagates.
    pub async fn send_text(&self, key: &ConversationKey, body: &str) -> Result<Message> {
        if !self.cache.has_messages(key) {
            return Err(Error::ConversationNotLoaded(key.contact_id.clone()));
        }

        let temp_id = Uuid::new_v4().to_string();
        let placeholder = Message {
            id: format!("tmp-{}", temp_id),
            client_temp_id: Some(temp_id.clone()),
            direction: Direction::Outgoing,
            timestamp: Utc::now(),
            body: Some(body.to_string()),
            media_url: None,
            media_type: None,
            ack: 0,
            status: Some(MessageStatus::Sending),
        };

        self.cache.update_messages(key, |entry| {
            append_message(&mut entry.messages, placeholder.clone());
        });

        match self
            .transport
            .send_message(&key.instance_id, &key.contact_id, body, &temp_id)
            .await
        {
            Ok(mut confirmed) => {
                // tolerate a backend that drops the correlation field
                confirmed.client_temp_id.get_or_insert(temp_id);
                self.cache.update_messages(key, |entry| {
                    reconcile_placeholder(&mut entry.messages, confirmed.clone());
                });
                Ok(confirmed)
            }
            Err(e) => {
                self.cache.update_messages(key, |entry| {
                    entry.messages.retain(|m| m.id != placeholder.id);
                });
                warn!(conversation = %key, error = %e, "send failed, placeholder removed");
                Err(e)
            }
        }
    }
}
