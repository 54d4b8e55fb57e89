//! Imgflip REST API Client
//!
//! HTTP client for the public Imgflip meme API.

use super::{MemeSource, MemeTemplate, RemoteError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Imgflip REST API client
pub struct ImgflipClient {
    client: Client,
    config: ImgflipConfig,
}

/// Configuration for the Imgflip client
#[derive(Debug, Clone)]
pub struct ImgflipConfig {
    /// Base URL for the API (e.g., "https://api.imgflip.com")
    pub base_url: String,
    /// Account used by `caption_image`
    pub username: String,
    pub password: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ImgflipConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.imgflip.com".to_string(),
            username: String::new(),
            password: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ImgflipClient {
    /// Create a new client with the given configuration
    pub fn new(mut config: ImgflipConfig) -> Result<Self, RemoteError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ImgflipConfig {
        &self.config
    }

    /// Form fields for a caption request
    fn caption_form(&self, template_id: &str, texts: &[String]) -> Vec<(String, String)> {
        let mut form = vec![
            ("template_id".to_string(), template_id.to_string()),
            ("username".to_string(), self.config.username.clone()),
            ("password".to_string(), self.config.password.clone()),
        ];
        for (i, text) in texts.iter().enumerate() {
            form.push((format!("boxes[{}][text]", i), text.clone()));
        }
        form
    }

    async fn read_body<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: ImgflipResponse<T> = response.json().await.map_err(classify)?;
        body.into_data()
    }
}

#[async_trait]
impl MemeSource for ImgflipClient {
    fn name(&self) -> &str {
        "imgflip"
    }

    async fn fetch_memes(&self) -> Result<Vec<MemeTemplate>, RemoteError> {
        let url = format!("{}/get_memes", self.config.base_url);

        let response = self.client.get(&url).send().await.map_err(classify)?;
        let data: MemesData = Self::read_body(response).await?;

        tracing::debug!(count = data.memes.len(), "Fetched meme templates");
        Ok(data.memes.into_iter().map(MemeTemplate::from).collect())
    }

    async fn caption_image(
        &self,
        template_id: &str,
        texts: &[String],
    ) -> Result<String, RemoteError> {
        if self.config.username.is_empty() {
            return Err(RemoteError::MissingCredentials("imgflip caption_image"));
        }

        let url = format!("{}/caption_image", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .form(&self.caption_form(template_id, texts))
            .send()
            .await
            .map_err(classify)?;

        let data: CaptionData = Self::read_body(response).await?;
        Ok(data.url)
    }
}

/// Map transport failures onto the error variants callers care about
fn classify(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::Unavailable
    } else {
        RemoteError::Request(e)
    }
}

// ============================================
// Response DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct ImgflipResponse<T> {
    success: bool,
    data: Option<T>,
    error_message: Option<String>,
}

impl<T> ImgflipResponse<T> {
    fn into_data(self) -> Result<T, RemoteError> {
        if !self.success {
            return Err(RemoteError::Rejected(
                self.error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| RemoteError::Malformed("missing data field".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct MemesData {
    #[serde(default)]
    memes: Vec<ImgflipMeme>,
}

#[derive(Debug, Deserialize)]
struct ImgflipMeme {
    id: String,
    name: String,
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    box_count: u32,
}

impl From<ImgflipMeme> for MemeTemplate {
    fn from(m: ImgflipMeme) -> Self {
        MemeTemplate {
            id: m.id,
            title: m.name,
            url: m.url,
            width: m.width,
            height: m.height,
            box_count: m.box_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: String,
}
