//! Meme Catalog
//!
//! Page-level queries over a `MemeSource`. Failures are logged and turned
//! into empty results, so a dead network renders as an empty list rather
//! than an error.

use super::{MemeSource, MemeTemplate, RemoteError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Like counts for well-known templates
///
/// The catalog API has no engagement data, so these stand in as fixed,
/// opaque popularity numbers. Unknown templates get zero.
const POPULAR_TEMPLATE_LIKES: &[(&str, u64)] = &[
    ("181913649", 9876), // Drake Hotline Bling
    ("87743020", 8654),  // Two Buttons
    ("112126428", 7823), // Distracted Boyfriend
    ("129242436", 7654), // Change My Mind
    ("124822590", 6543), // Left Exit 12 Off Ramp
    ("217743513", 5987), // UNO Draw 25 Cards
    ("131087935", 5876), // Running Away Balloon
    ("247375501", 5432), // Buff Doge vs. Cheems
    ("222403160", 4987), // Bernie I Am Once Again Asking
    ("119139145", 4765), // Blank Nut Button
];

const TOP_USERS: &[(u32, &str, u64, u32)] = &[
    (1, "MemeKing", 15432, 45),
    (2, "MemeQueen", 12543, 38),
    (3, "DankMaster", 10987, 52),
    (4, "MemeCreator", 9876, 29),
    (5, "MemeLord", 8765, 33),
    (6, "MemeArtist", 7654, 27),
    (7, "MemePro", 6543, 31),
    (8, "MemeGuru", 5432, 25),
    (9, "MemeWizard", 4321, 22),
    (10, "MemeMaster", 3210, 19),
];

/// A catalog template with engagement counters attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: String,
    pub title: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub box_count: u32,
    pub likes: u64,
    pub comments: u64,
}

impl From<MemeTemplate> for Meme {
    fn from(t: MemeTemplate) -> Self {
        let likes = POPULAR_TEMPLATE_LIKES
            .iter()
            .find(|(id, _)| *id == t.id)
            .map(|(_, likes)| *likes)
            .unwrap_or(0);

        Meme {
            id: t.id,
            title: t.title,
            url: t.url,
            width: t.width,
            height: t.height,
            box_count: t.box_count,
            likes,
            comments: 0,
        }
    }
}

/// A leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUser {
    pub id: u32,
    pub username: String,
    pub total_likes: u64,
    pub meme_count: u32,
}

/// Ordering for meme lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most liked first
    #[default]
    Likes,
    /// Alphabetical by title
    Title,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "likes" => Ok(SortOrder::Likes),
            "title" | "name" => Ok(SortOrder::Title),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Query surface over a remote meme source
#[derive(Clone)]
pub struct MemeCatalog {
    source: Arc<dyn MemeSource>,
}

impl MemeCatalog {
    pub fn new(source: Arc<dyn MemeSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn MemeSource> {
        &self.source
    }

    /// Every template, with like counts attached
    pub async fn trending(&self) -> Vec<Meme> {
        match self.source.fetch_memes().await {
            Ok(templates) => templates.into_iter().map(Meme::from).collect(),
            Err(e) => {
                self.log_failure("trending", &e);
                Vec::new()
            }
        }
    }

    /// Templates whose title contains `query`, ignoring case
    pub async fn search(&self, query: &str) -> Vec<Meme> {
        let needle = query.to_lowercase();
        self.trending()
            .await
            .into_iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Meme> {
        self.trending().await.into_iter().find(|m| m.id == id)
    }

    /// Most liked templates, at most `limit`
    pub async fn top_memes(&self, limit: usize) -> Vec<Meme> {
        let mut memes = self.trending().await;
        sort_memes(&mut memes, SortOrder::Likes);
        memes.truncate(limit);
        memes
    }

    /// Other templates to show next to `id`, at most `limit`
    pub async fn related(&self, id: &str, limit: usize) -> Vec<Meme> {
        self.trending()
            .await
            .into_iter()
            .filter(|m| m.id != id)
            .take(limit)
            .collect()
    }

    /// Caption a template; `None` if the source refused or failed
    pub async fn create_custom_meme(&self, template_id: &str, texts: &[String]) -> Option<String> {
        match self.source.caption_image(template_id, texts).await {
            Ok(url) => Some(url),
            Err(e) => {
                self.log_failure("create_custom_meme", &e);
                None
            }
        }
    }

    /// Static creator leaderboard
    pub fn top_users(&self) -> Vec<LeaderboardUser> {
        TOP_USERS
            .iter()
            .map(|&(id, username, total_likes, meme_count)| LeaderboardUser {
                id,
                username: username.to_string(),
                total_likes,
                meme_count,
            })
            .collect()
    }

    fn log_failure(&self, operation: &'static str, e: &RemoteError) {
        tracing::error!(
            source = self.source.name(),
            operation,
            error = %e,
            "Meme source request failed"
        );
    }
}

/// Sort memes in place; ties keep their catalog order
pub fn sort_memes(memes: &mut [Meme], order: SortOrder) {
    match order {
        SortOrder::Likes => memes.sort_by(|a, b| b.likes.cmp(&a.likes)),
        SortOrder::Title => memes.sort_by_key(|m| m.title.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        templates: Vec<MemeTemplate>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(ids: &[(&str, &str)]) -> Self {
            Self {
                templates: ids
                    .iter()
                    .map(|(id, title)| MemeTemplate {
                        id: id.to_string(),
                        title: title.to_string(),
                        url: format!("https://i.imgflip.com/{}.jpg", id),
                        width: 500,
                        height: 500,
                        box_count: 2,
                    })
                    .collect(),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl MemeSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_memes(&self) -> Result<Vec<MemeTemplate>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RemoteError::Unavailable)
            } else {
                Ok(self.templates.clone())
            }
        }

        async fn caption_image(
            &self,
            template_id: &str,
            texts: &[String],
        ) -> Result<String, RemoteError> {
            if self.fail {
                Err(RemoteError::Timeout)
            } else {
                Ok(format!("https://i.imgflip.com/{}-{}.jpg", template_id, texts.len()))
            }
        }
    }

    fn catalog() -> MemeCatalog {
        MemeCatalog::new(Arc::new(FakeSource::new(&[
            ("1", "Unknown Template"),
            ("87743020", "Two Buttons"),
            ("181913649", "Drake Hotline Bling"),
        ])))
    }

    #[tokio::test]
    async fn test_trending_attaches_likes() {
        let memes = catalog().trending().await;
        assert_eq!(memes.len(), 3);
        assert_eq!(memes[0].likes, 0);
        assert_eq!(memes[1].likes, 8654);
        assert_eq!(memes[2].likes, 9876);
        assert!(memes.iter().all(|m| m.comments == 0));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let found = catalog().search("drake").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "181913649");

        assert!(catalog().search("nothing").await.is_empty());
        assert_eq!(catalog().search("").await.len(), 3);
    }

    #[tokio::test]
    async fn test_get_by_id_and_related() {
        let catalog = catalog();
        assert_eq!(
            catalog.get_by_id("87743020").await.unwrap().title,
            "Two Buttons"
        );
        assert!(catalog.get_by_id("missing").await.is_none());

        let related = catalog.related("87743020", 5).await;
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|m| m.id != "87743020"));
    }

    #[tokio::test]
    async fn test_top_memes() {
        let top = catalog().top_memes(2).await;
        let ids: Vec<&str> = top.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["181913649", "87743020"]);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let catalog = MemeCatalog::new(Arc::new(FakeSource::failing()));
        assert!(catalog.trending().await.is_empty());
        assert!(catalog.search("x").await.is_empty());
        assert!(catalog.get_by_id("1").await.is_none());
        assert!(catalog
            .create_custom_meme("1", &["a".to_string()])
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_create_custom_meme() {
        let url = catalog()
            .create_custom_meme("181913649", &["a".to_string(), "b".to_string()])
            .await;
        assert_eq!(url.as_deref(), Some("https://i.imgflip.com/181913649-2.jpg"));
    }

    #[test]
    fn test_top_users() {
        let users = catalog().top_users();
        assert_eq!(users.len(), 10);
        assert_eq!(users[0].username, "MemeKing");
        assert!(users.windows(2).all(|w| w[0].total_likes >= w[1].total_likes));
    }

    #[test]
    fn test_sort_orders() {
        let mut memes: Vec<Meme> = ["b", "A", "c"]
            .iter()
            .enumerate()
            .map(|(i, title)| Meme {
                id: i.to_string(),
                title: title.to_string(),
                url: String::new(),
                width: 0,
                height: 0,
                box_count: 0,
                likes: i as u64,
                comments: 0,
            })
            .collect();

        sort_memes(&mut memes, SortOrder::Title);
        assert_eq!(memes[0].title, "A");

        sort_memes(&mut memes, SortOrder::Likes);
        assert_eq!(memes[0].title, "c");

        assert_eq!("likes".parse::<SortOrder>().unwrap(), SortOrder::Likes);
        assert_eq!("Title".parse::<SortOrder>().unwrap(), SortOrder::Title);
        assert!("date".parse::<SortOrder>().is_err());
    }

    #[tokio::test]
    async fn test_each_query_fetches_once() {
        let source = Arc::new(FakeSource::new(&[("1", "x")]));
        let catalog = MemeCatalog::new(source.clone());
        catalog.search("x").await;
        catalog.top_memes(1).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
