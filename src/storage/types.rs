//! Core data types for the meme store
//!
//! This module defines the records persisted under each storage key:
//! - `MemeId`: Identifier of a remote or local meme
//! - `Comment`: A timestamped note attached to a meme
//! - `UserProfile`: The singleton local profile
//! - `UploadedMeme`: A meme created locally from an image file
//! - `StorageKey` and `StoreEvent`: Key layout and change notifications

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a meme
///
/// Remote catalog ids arrive as strings while older records may hold bare
/// numbers. The two are never equal to each other: `"1"` and `1` are
/// different memes, exactly as they were when the data was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemeId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemeId::Number(n) => write!(f, "{}", n),
            MemeId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MemeId {
    fn from(s: &str) -> Self {
        MemeId::Text(s.to_string())
    }
}

impl From<String> for MemeId {
    fn from(s: String) -> Self {
        MemeId::Text(s)
    }
}

impl From<i64> for MemeId {
    fn from(n: i64) -> Self {
        MemeId::Number(n)
    }
}

/// A comment left on a meme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Creation time in Unix milliseconds, unique within the meme's comments
    pub id: i64,
    /// Free-form comment text
    pub text: String,
    /// Creation time as an ISO-8601 string
    pub timestamp: String,
}

impl Comment {
    /// Parse the stored timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// The local user's profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    /// Fields written by other clients, kept on round-trip
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bio: bio.into(),
            extra: Map::new(),
        }
    }

    /// True when nothing has been filled in yet
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.bio.is_empty() && self.extra.is_empty()
    }

    /// Copy whose extras cannot shadow `name` or `bio` once serialized
    pub(crate) fn to_stored(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            bio: self.bio.clone(),
            extra: strip_fields(self.extra.clone(), PROFILE_FIELDS),
        }
    }
}

/// Field names owned by `UserProfile`
const PROFILE_FIELDS: &[&str] = &["name", "bio"];

/// Field names owned by `UploadedMeme`; never taken from caller extras
const UPLOAD_FIELDS: &[&str] = &[
    "id",
    "url",
    "name",
    "uploadedAt",
    "likes",
    "comments",
    "updatedAt",
];

/// Prefix of every locally uploaded meme id
pub const LOCAL_ID_PREFIX: &str = "local_";

/// A meme uploaded from this device
///
/// Stored most-recent-first. `likes` and `comments` are opaque counters; the
/// store only initialises them to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMeme {
    /// `local_<millis>`, unique across all uploads
    pub id: String,
    /// Image as a data URI
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Any additional caller-provided fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadedMeme {
    /// Numeric part of a `local_<n>` id
    pub fn sequence(&self) -> Option<i64> {
        self.id
            .strip_prefix(LOCAL_ID_PREFIX)
            .and_then(|n| n.parse().ok())
    }

    /// Merge partial fields into this record and stamp the update time
    pub fn apply(&mut self, patch: UploadedMemePatch, updated_at: String) {
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(likes) = patch.likes {
            self.likes = likes;
        }
        if let Some(comments) = patch.comments {
            self.comments = comments;
        }
        self.extra.extend(strip_reserved(patch.extra));
        self.updated_at = Some(updated_at);
    }
}

/// Input for a new upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUploadedMeme {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewUploadedMeme {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// Builder method: attach an extra field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Turn the input into a stored record with the given identity
    pub(crate) fn into_record(self, id: String, uploaded_at: String) -> UploadedMeme {
        UploadedMeme {
            id,
            url: self.url,
            name: self.name,
            uploaded_at,
            likes: 0,
            comments: 0,
            updated_at: None,
            extra: strip_reserved(self.extra),
        }
    }
}

/// Partial update for an uploaded meme
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadedMemePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadedMemePatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn likes(mut self, likes: u64) -> Self {
        self.likes = Some(likes);
        self
    }

    pub fn comments(mut self, comments: u64) -> Self {
        self.comments = Some(comments);
        self
    }
}

fn strip_reserved(extra: Map<String, Value>) -> Map<String, Value> {
    strip_fields(extra, UPLOAD_FIELDS)
}

fn strip_fields(mut extra: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    extra.retain(|k, _| !fields.contains(&k.as_str()));
    extra
}

/// Logical collections, one backend key each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    LikedMemes,
    Comments,
    UserProfile,
    DarkMode,
    UploadedMemes,
}

impl StorageKey {
    /// Every key the store owns
    pub fn all() -> &'static [StorageKey] {
        &[
            StorageKey::LikedMemes,
            StorageKey::Comments,
            StorageKey::UserProfile,
            StorageKey::DarkMode,
            StorageKey::UploadedMemes,
        ]
    }

    /// Key name without the store prefix
    pub fn name(&self) -> &'static str {
        match self {
            StorageKey::LikedMemes => "liked_memes",
            StorageKey::Comments => "comments",
            StorageKey::UserProfile => "user_profile",
            StorageKey::DarkMode => "dark_mode",
            StorageKey::UploadedMemes => "uploaded_memes",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Change published after a successful write
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    LikeToggled { meme_id: MemeId, liked: bool },
    CommentAdded { meme_id: MemeId, comment_id: i64 },
    CommentDeleted { meme_id: MemeId, comment_id: i64 },
    ProfileUpdated,
    DarkModeChanged(bool),
    UploadAdded(String),
    UploadUpdated(String),
    UploadDeleted(String),
    Cleared,
}

impl StoreEvent {
    /// Key whose value changed
    pub fn key(&self) -> Option<StorageKey> {
        match self {
            StoreEvent::LikeToggled { .. } => Some(StorageKey::LikedMemes),
            StoreEvent::CommentAdded { .. } | StoreEvent::CommentDeleted { .. } => {
                Some(StorageKey::Comments)
            }
            StoreEvent::ProfileUpdated => Some(StorageKey::UserProfile),
            StoreEvent::DarkModeChanged(_) => Some(StorageKey::DarkMode),
            StoreEvent::UploadAdded(_)
            | StoreEvent::UploadUpdated(_)
            | StoreEvent::UploadDeleted(_) => Some(StorageKey::UploadedMemes),
            StoreEvent::Cleared => None,
        }
    }
}

/// Current time as an ISO-8601 string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meme_id_keeps_json_type() {
        let ids: Vec<MemeId> = serde_json::from_str(r#"["181913649", 42]"#).unwrap();
        assert_eq!(ids[0], MemeId::from("181913649"));
        assert_eq!(ids[1], MemeId::from(42));
        assert_ne!(MemeId::from("42"), MemeId::from(42));
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"["181913649",42]"#);
    }

    #[test]
    fn test_comment_timestamp() {
        let comment = Comment {
            id: 1,
            text: "hello".to_string(),
            timestamp: now_iso(),
        };
        assert!(comment.created_at().is_some());
        assert!(comment.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_profile_defaults_and_extras() {
        let profile: UserProfile = serde_json::from_str("{}").unwrap();
        assert!(profile.is_empty());

        let profile: UserProfile =
            serde_json::from_value(json!({"name": "Ana", "avatar": "a.png"})).unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.bio, "");
        assert_eq!(profile.extra["avatar"], "a.png");
    }

    #[test]
    fn test_profile_extras_cannot_shadow_fields() {
        let mut profile = UserProfile::new("Ana", "memes");
        profile.extra.insert("name".to_string(), json!("Other"));
        profile.extra.insert("avatar".to_string(), json!("a.png"));

        let stored = profile.to_stored();
        assert_eq!(stored.name, "Ana");
        assert!(!stored.extra.contains_key("name"));
        assert_eq!(stored.extra["avatar"], "a.png");
    }

    #[test]
    fn test_uploaded_meme_camel_case() {
        let meme = NewUploadedMeme::new("data:image/png;base64,AA==", "cat")
            .field("timestamp", "2024-01-01T00:00:00.000Z")
            .field("id", 5)
            .into_record("local_10".to_string(), "2024-01-01T00:00:01.000Z".to_string());

        let value = serde_json::to_value(&meme).unwrap();
        assert_eq!(value["id"], "local_10");
        assert_eq!(value["uploadedAt"], "2024-01-01T00:00:01.000Z");
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00.000Z");
        assert!(value.get("updatedAt").is_none());
        assert_eq!(meme.sequence(), Some(10));
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut meme = NewUploadedMeme::new("data:,", "old")
            .into_record("local_1".to_string(), now_iso());
        let mut patch = UploadedMemePatch::default().name("new").likes(3);
        patch.extra.insert("uploadedAt".to_string(), json!("ignored"));
        patch.extra.insert("caption".to_string(), json!("top text"));

        meme.apply(patch, "2024-02-02T00:00:00.000Z".to_string());

        assert_eq!(meme.name, "new");
        assert_eq!(meme.url, "data:,");
        assert_eq!(meme.likes, 3);
        assert_eq!(meme.extra["caption"], "top text");
        assert!(!meme.extra.contains_key("uploadedAt"));
        assert_eq!(meme.updated_at.as_deref(), Some("2024-02-02T00:00:00.000Z"));
    }

    #[test]
    fn test_event_keys() {
        assert_eq!(
            StoreEvent::DarkModeChanged(true).key(),
            Some(StorageKey::DarkMode)
        );
        assert_eq!(StoreEvent::Cleared.key(), None);
        assert_eq!(StorageKey::all().len(), 5);
    }
}
