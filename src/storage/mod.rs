//! Memeverse Storage
//!
//! This module provides the local persistence layer:
//!
//! - **types**: Stored records (Comment, UserProfile, UploadedMeme, MemeId)
//! - **backend**: Key-value media (in-memory, file per key)
//! - **envelope**: Versioned JSON wrapper with migration on read
//! - **store**: `MemeStore`, the CRUD surface over all collections
//! - **error**: Error types
//!
//! # Layout
//!
//! ```text
//!   memeverse_liked_memes     → ["181913649", 87743020, ...]
//!   memeverse_comments        → {"<meme id>": [{id, text, timestamp}, ...]}
//!   memeverse_user_profile    → {name, bio}
//!   memeverse_dark_mode       → true | false
//!   memeverse_uploaded_memes  → [UploadedMeme, ...]   (most recent first)
//! ```
//!
//! Each value is stored inside a `{"version": 1, "data": ...}` envelope.
//!
//! # Example
//!
//! ```rust
//! use memeverse::storage::{MemeId, MemeStore};
//!
//! let store = MemeStore::in_memory();
//! let drake = MemeId::from("181913649");
//!
//! assert!(store.toggle_meme_like(&drake));
//! assert!(store.is_meme_liked(&drake));
//!
//! let comment = store.add_comment(&drake, "classic").unwrap();
//! assert_eq!(store.get_comments(&drake), vec![comment]);
//! ```

pub mod backend;
pub mod envelope;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use envelope::{Decoded, CURRENT_SCHEMA_VERSION};
pub use error::{StoreError, StoreResult};
pub use store::{CommentMap, MemeStore, StoreConfig};
pub use types::{
    now_iso, Comment, MemeId, NewUploadedMeme, StorageKey, StoreEvent, UploadedMeme,
    UploadedMemePatch, UserProfile, LOCAL_ID_PREFIX,
};
