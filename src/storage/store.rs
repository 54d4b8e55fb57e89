//! Meme store
//!
//! CRUD over the five storage keys. Every public operation comes in two
//! flavours:
//!
//! - `try_*` returns a `StoreResult` so callers can tell a failed read from
//!   an empty collection
//! - the plain method never fails: errors are logged and the documented
//!   default (empty collection, `false`, `None`) is returned instead
//!
//! Each read-modify-write runs under a store-wide lock, so operations from
//! one process never interleave. Writers in other processes sharing the same
//! medium are not coordinated; the last whole-key write wins.

use crate::storage::backend::{KeyValueBackend, MemoryBackend};
use crate::storage::envelope;
use crate::storage::error::StoreResult;
use crate::storage::types::{
    now_iso, Comment, MemeId, NewUploadedMeme, StorageKey, StoreEvent, UploadedMeme,
    UploadedMemePatch, UserProfile, LOCAL_ID_PREFIX,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Comments keyed by the string form of the meme id
pub type CommentMap = BTreeMap<String, Vec<Comment>>;

/// Configuration for the meme store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prepended to every key name (default: "memeverse_")
    pub key_prefix: String,
    /// Capacity of the change-event channel
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "memeverse_".to_string(),
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Default::default()
        }
    }
}

/// Local persistence for likes, comments, profile, theme and uploads
pub struct MemeStore {
    backend: Arc<dyn KeyValueBackend>,
    config: StoreConfig,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
    /// Last timestamp handed out as an id, keeps ids strictly increasing
    last_stamp: AtomicI64,
    events: broadcast::Sender<StoreEvent>,
}

impl MemeStore {
    /// Create a store over `backend` with default configuration
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn KeyValueBackend>, config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            backend,
            config,
            write_lock: Mutex::new(()),
            last_stamp: AtomicI64::new(0),
            events,
        }
    }

    /// Store backed by a fresh in-memory map
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Full backend key for a collection
    pub fn key(&self, key: StorageKey) -> String {
        format!("{}{}", self.config.key_prefix, key.name())
    }

    /// Receive a `StoreEvent` after every successful write
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ============================================
    // Liked memes
    // ============================================

    pub fn try_get_liked_memes(&self) -> StoreResult<Vec<MemeId>> {
        self.read(StorageKey::LikedMemes)
    }

    /// Liked meme ids in the order they were liked
    pub fn get_liked_memes(&self) -> Vec<MemeId> {
        degrade("get_liked_memes", self.try_get_liked_memes(), Vec::new())
    }

    pub fn try_is_meme_liked(&self, id: &MemeId) -> StoreResult<bool> {
        Ok(self.try_get_liked_memes()?.contains(id))
    }

    pub fn is_meme_liked(&self, id: &MemeId) -> bool {
        degrade("is_meme_liked", self.try_is_meme_liked(id), false)
    }

    /// Flip membership of `id` in the liked set, returning the new state
    pub fn try_toggle_meme_like(&self, id: &MemeId) -> StoreResult<bool> {
        let _guard = self.write_lock.lock()?;
        let mut liked: Vec<MemeId> = self.read(StorageKey::LikedMemes)?;

        let now_liked = if liked.contains(id) {
            liked.retain(|m| m != id);
            false
        } else {
            liked.push(id.clone());
            true
        };

        self.write(StorageKey::LikedMemes, &liked)?;
        self.publish(StoreEvent::LikeToggled {
            meme_id: id.clone(),
            liked: now_liked,
        });
        Ok(now_liked)
    }

    /// Flip membership of `id`; `false` if the write failed
    pub fn toggle_meme_like(&self, id: &MemeId) -> bool {
        degrade("toggle_meme_like", self.try_toggle_meme_like(id), false)
    }

    // ============================================
    // Comments
    // ============================================

    pub fn try_get_comments(&self, id: &MemeId) -> StoreResult<Vec<Comment>> {
        let mut all: CommentMap = self.read(StorageKey::Comments)?;
        Ok(all.remove(&id.to_string()).unwrap_or_default())
    }

    /// Comments on a meme, oldest first
    pub fn get_comments(&self, id: &MemeId) -> Vec<Comment> {
        degrade("get_comments", self.try_get_comments(id), Vec::new())
    }

    /// Append a new comment to the end of a meme's thread
    pub fn try_add_comment(&self, id: &MemeId, text: &str) -> StoreResult<Comment> {
        let _guard = self.write_lock.lock()?;
        let mut all: CommentMap = self.read(StorageKey::Comments)?;
        let thread = all.entry(id.to_string()).or_default();

        let newest = thread.iter().map(|c| c.id).max().unwrap_or(i64::MIN);
        let comment = Comment {
            id: self.next_stamp().max(newest.saturating_add(1)),
            text: text.to_string(),
            timestamp: now_iso(),
        };
        thread.push(comment.clone());

        self.write(StorageKey::Comments, &all)?;
        self.publish(StoreEvent::CommentAdded {
            meme_id: id.clone(),
            comment_id: comment.id,
        });
        Ok(comment)
    }

    /// Append a comment; `None` means nothing was saved
    pub fn add_comment(&self, id: &MemeId, text: &str) -> Option<Comment> {
        degrade("add_comment", self.try_add_comment(id, text).map(Some), None)
    }

    /// Remove the first comment with `comment_id`, `false` if absent
    pub fn try_delete_comment(&self, id: &MemeId, comment_id: i64) -> StoreResult<bool> {
        let _guard = self.write_lock.lock()?;
        let mut all: CommentMap = self.read(StorageKey::Comments)?;

        let Some(thread) = all.get_mut(&id.to_string()) else {
            return Ok(false);
        };
        let Some(index) = thread.iter().position(|c| c.id == comment_id) else {
            return Ok(false);
        };
        thread.remove(index);

        self.write(StorageKey::Comments, &all)?;
        self.publish(StoreEvent::CommentDeleted {
            meme_id: id.clone(),
            comment_id,
        });
        Ok(true)
    }

    pub fn delete_comment(&self, id: &MemeId, comment_id: i64) -> bool {
        degrade(
            "delete_comment",
            self.try_delete_comment(id, comment_id),
            false,
        )
    }

    // ============================================
    // User profile
    // ============================================

    pub fn try_get_user_profile(&self) -> StoreResult<UserProfile> {
        self.read(StorageKey::UserProfile)
    }

    pub fn get_user_profile(&self) -> UserProfile {
        degrade(
            "get_user_profile",
            self.try_get_user_profile(),
            UserProfile::default(),
        )
    }

    /// Replace the stored profile as a whole
    pub fn try_update_user_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let _guard = self.write_lock.lock()?;
        self.write(StorageKey::UserProfile, &profile.to_stored())?;
        self.publish(StoreEvent::ProfileUpdated);
        Ok(())
    }

    pub fn update_user_profile(&self, profile: &UserProfile) -> bool {
        degrade(
            "update_user_profile",
            self.try_update_user_profile(profile).map(|_| true),
            false,
        )
    }

    // ============================================
    // Dark mode
    // ============================================

    pub fn try_get_dark_mode(&self) -> StoreResult<bool> {
        self.read(StorageKey::DarkMode)
    }

    pub fn get_dark_mode(&self) -> bool {
        degrade("get_dark_mode", self.try_get_dark_mode(), false)
    }

    pub fn try_set_dark_mode(&self, enabled: bool) -> StoreResult<()> {
        let _guard = self.write_lock.lock()?;
        self.write(StorageKey::DarkMode, &enabled)?;
        self.publish(StoreEvent::DarkModeChanged(enabled));
        Ok(())
    }

    pub fn set_dark_mode(&self, enabled: bool) -> bool {
        degrade(
            "set_dark_mode",
            self.try_set_dark_mode(enabled).map(|_| true),
            false,
        )
    }

    // ============================================
    // Uploaded memes
    // ============================================

    pub fn try_get_uploaded_memes(&self) -> StoreResult<Vec<UploadedMeme>> {
        self.read(StorageKey::UploadedMemes)
    }

    /// Uploaded memes, most recent first
    pub fn get_uploaded_memes(&self) -> Vec<UploadedMeme> {
        degrade(
            "get_uploaded_memes",
            self.try_get_uploaded_memes(),
            Vec::new(),
        )
    }

    /// Store a new upload at the head of the list
    pub fn try_add_uploaded_meme(&self, meme: NewUploadedMeme) -> StoreResult<UploadedMeme> {
        let _guard = self.write_lock.lock()?;
        let mut uploads: Vec<UploadedMeme> = self.read(StorageKey::UploadedMemes)?;

        let highest = uploads
            .iter()
            .filter_map(UploadedMeme::sequence)
            .max()
            .unwrap_or(i64::MIN);
        let sequence = self.next_stamp().max(highest.saturating_add(1));
        let record = meme.into_record(format!("{}{}", LOCAL_ID_PREFIX, sequence), now_iso());

        uploads.insert(0, record.clone());
        self.write(StorageKey::UploadedMemes, &uploads)?;
        self.publish(StoreEvent::UploadAdded(record.id.clone()));

        tracing::debug!(id = %record.id, name = %record.name, "Stored uploaded meme");
        Ok(record)
    }

    /// Store a new upload; `None` means nothing was saved
    pub fn add_uploaded_meme(&self, meme: NewUploadedMeme) -> Option<UploadedMeme> {
        degrade(
            "add_uploaded_meme",
            self.try_add_uploaded_meme(meme).map(Some),
            None,
        )
    }

    /// Remove an upload by id, reporting whether one was found
    pub fn try_delete_uploaded_meme(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock()?;
        let mut uploads: Vec<UploadedMeme> = self.read(StorageKey::UploadedMemes)?;

        let before = uploads.len();
        uploads.retain(|m| m.id != id);
        let removed = uploads.len() != before;

        self.write(StorageKey::UploadedMemes, &uploads)?;
        if removed {
            self.publish(StoreEvent::UploadDeleted(id.to_string()));
        }
        Ok(removed)
    }

    /// Remove an upload by id
    ///
    /// Returns `true` whenever the filtered list was persisted, including when
    /// no upload had that id. Use [`MemeStore::try_delete_uploaded_meme`] to
    /// learn whether anything was removed.
    pub fn delete_uploaded_meme(&self, id: &str) -> bool {
        degrade(
            "delete_uploaded_meme",
            self.try_delete_uploaded_meme(id).map(|_| true),
            false,
        )
    }

    /// Merge `patch` into the upload with `id`; `None` if there is none
    pub fn try_update_uploaded_meme(
        &self,
        id: &str,
        patch: UploadedMemePatch,
    ) -> StoreResult<Option<UploadedMeme>> {
        let _guard = self.write_lock.lock()?;
        let mut uploads: Vec<UploadedMeme> = self.read(StorageKey::UploadedMemes)?;

        let Some(meme) = uploads.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        meme.apply(patch, now_iso());
        let updated = meme.clone();

        self.write(StorageKey::UploadedMemes, &uploads)?;
        self.publish(StoreEvent::UploadUpdated(updated.id.clone()));
        Ok(Some(updated))
    }

    pub fn update_uploaded_meme(&self, id: &str, patch: UploadedMemePatch) -> Option<UploadedMeme> {
        degrade(
            "update_uploaded_meme",
            self.try_update_uploaded_meme(id, patch),
            None,
        )
    }

    // ============================================
    // Reset
    // ============================================

    /// Erase every key the store owns
    pub fn try_clear_all(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock()?;
        for key in StorageKey::all() {
            self.backend.remove_item(&self.key(*key))?;
        }
        self.publish(StoreEvent::Cleared);
        tracing::info!("Cleared all stored meme data");
        Ok(())
    }

    pub fn clear_all(&self) -> bool {
        degrade("clear_all", self.try_clear_all().map(|_| true), false)
    }

    // ============================================
    // Internals
    // ============================================

    fn read<T: DeserializeOwned + Default>(&self, key: StorageKey) -> StoreResult<T> {
        let full_key = self.key(key);
        let raw = match self.backend.get_item(&full_key)? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(T::default()),
        };

        let decoded = envelope::decode::<T>(&full_key, &raw)?;
        if decoded.needs_rewrite() {
            tracing::warn!(
                key = %full_key,
                stored_version = decoded.stored_version,
                "Migrated legacy value on read"
            );
        }
        Ok(decoded.value)
    }

    fn write<T: Serialize>(&self, key: StorageKey, value: &T) -> StoreResult<()> {
        let full_key = self.key(key);
        let raw = envelope::encode(value)?;
        self.backend.set_item(&full_key, &raw)?;
        tracing::trace!(key = %full_key, bytes = raw.len(), "Wrote value");
        Ok(())
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Current time in ms, strictly greater than any stamp handed out before
    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.saturating_add(1));
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Log a failed operation and fall back to its default
fn degrade<T>(operation: &'static str, result: StoreResult<T>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(operation, error = %e, "Store operation failed, using default");
            default
        }
    }
}
