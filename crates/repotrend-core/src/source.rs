use tokio::sync::watch;

use crate::{
    models::{Repository, TimeFrame},
    Result,
};

/// Remote side: everything that comes from the forge API
///
/// `GitHubSource` is the real implementation; tests use the mockall mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Free-text search restricted to the time frame
    async fn search(
        &self,
        query: &str,
        frame: TimeFrame,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>>;

    /// One page of the trending list for the time frame
    async fn trending_page(
        &self,
        frame: TimeFrame,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>>;

    /// `Ok(None)` when the forge doesn't know the id
    async fn repository_by_id(&self, id: i64) -> Result<Option<Repository>>;
}

/// Local side: the persisted favorites list
#[async_trait::async_trait]
pub trait FavoritesSource: Send + Sync {
    /// Current favorites, most recently favorited first
    async fn favorites(&self) -> Result<Vec<Repository>>;

    async fn add(&self, repo: &Repository) -> Result<()>;

    async fn remove(&self, id: i64) -> Result<()>;

    async fn is_favorite(&self, id: i64) -> Result<bool>;

    /// Substring match on name, full name and description
    async fn search(&self, query: &str) -> Result<Vec<Repository>>;

    /// Any stored row, favorite or not
    async fn by_id(&self, id: i64) -> Result<Option<Repository>>;

    /// Favorites list, re-published after every change
    fn subscribe(&self) -> watch::Receiver<Vec<Repository>>;
}

