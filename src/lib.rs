//! # Memeverse
//!
//! Core of a meme browsing application: local persistence for everything a
//! visitor does (likes, comments, profile, theme, uploads) and a client for
//! the public Imgflip template catalog.
//!
//! ## Features
//!
//! - **Local store**: JSON values under fixed keys, versioned and migrated on read
//! - **Never fails**: store operations degrade to empty defaults and log the cause
//! - **Remote catalog**: async Imgflip client behind a `MemeSource` trait
//! - **Shared state**: theme flag and catalog snapshot with change notifications
//!
//! ## Modules
//!
//! - [`storage`]: Persistent store and key-value backends
//! - [`remote`]: Meme catalog client and page-level queries
//! - [`state`]: Application state shared by views
//! - [`config`]: Configuration file and environment overrides
//! - [`upload`]: Image file to data-URI conversion
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memeverse::{AppState, ImgflipClient, ImgflipConfig, MemeId, MemeStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemeStore::in_memory());
//!     let client = ImgflipClient::new(ImgflipConfig::default())?;
//!
//!     // Read the theme and fetch the catalog once
//!     let state = AppState::initialize(Arc::clone(&store), &client).await;
//!     println!("{} templates, dark mode: {}", state.memes().len(), state.dark_mode());
//!
//!     // Like the first template and leave a comment
//!     if let Some(meme) = state.memes().first() {
//!         let id = MemeId::from(meme.id.as_str());
//!         store.toggle_meme_like(&id);
//!         store.add_comment(&id, "timeless");
//!     }
//!
//!     state.toggle_theme();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod remote;
pub mod state;
pub mod storage;
pub mod upload;

// Re-export top-level types for convenience
pub use storage::{
    Comment, FileBackend, KeyValueBackend, MemeId, MemeStore, MemoryBackend, NewUploadedMeme,
    StorageKey, StoreConfig, StoreError, StoreEvent, StoreResult, UploadedMeme,
    UploadedMemePatch, UserProfile,
};

pub use remote::{
    ImgflipClient, ImgflipConfig, LeaderboardUser, Meme, MemeCatalog, MemeSource, MemeTemplate,
    RemoteError, SortOrder,
};

pub use state::{AppState, CatalogStatus, StateEvent};

pub use config::{
    BackendKind, Config, ConfigError, LoggingConfig, RemoteConfig, StorageConfig,
};

pub use upload::{upload_from_file, UploadError};
