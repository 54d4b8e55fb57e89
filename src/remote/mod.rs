//! Remote Meme Source
//!
//! Read-only access to a third-party meme template catalog.
//!
//! ## Architecture
//!
//! - **MemeSource**: trait every catalog backend implements
//! - **ImgflipClient**: reqwest client for api.imgflip.com
//! - **MemeCatalog**: page-level queries (trending, search, leaderboard)
//!   that degrade to empty results instead of failing
//!
//! Every call is asynchronous, may fail, and is safe to retry.

mod catalog;
mod client;

pub use catalog::{sort_memes, LeaderboardUser, Meme, MemeCatalog, SortOrder};
pub use client::{ImgflipClient, ImgflipConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A meme template as published by the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeTemplate {
    pub id: String,
    pub title: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Number of caption boxes the template supports
    pub box_count: u32,
}

/// Common trait for remote meme catalogs
#[async_trait]
pub trait MemeSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch the full template catalog
    async fn fetch_memes(&self) -> Result<Vec<MemeTemplate>, RemoteError>;

    /// Render `texts` onto a template, returning the generated image URL
    async fn caption_image(
        &self,
        template_id: &str,
        texts: &[String],
    ) -> Result<String, RemoteError>;
}

/// Errors that can occur when talking to a meme catalog
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Meme source unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),
}
