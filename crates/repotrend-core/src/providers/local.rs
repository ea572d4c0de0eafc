// Favorites backed by the SQLite store
use async_trait::async_trait;
use chrono::Utc;
use repotrend_store::FavoritesStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::{
    mapper::{repo_to_row, row_to_repo},
    models::Repository,
    source::FavoritesSource,
    Result,
};

/// FavoritesSource over `FavoritesStore`
///
/// Keeps a watch channel with the current favorites list so observers see
/// every add/remove without polling.
pub struct LocalFavorites {
    store: Arc<FavoritesStore>,
    updates: watch::Sender<Vec<Repository>>,
}

impl LocalFavorites {
    pub fn new(store: Arc<FavoritesStore>) -> Result<Self> {
        let current = Self::read_favorites(&store)?;
        let (updates, _) = watch::channel(current);
        Ok(Self { store, updates })
    }

    fn read_favorites(store: &FavoritesStore) -> Result<Vec<Repository>> {
        Ok(store.favorites()?.into_iter().map(row_to_repo).collect())
    }

    fn publish(&self) -> Result<()> {
        let current = Self::read_favorites(&self.store)?;
        self.updates.send_replace(current);
        Ok(())
    }
}

#[async_trait]
impl FavoritesSource for LocalFavorites {
    async fn favorites(&self) -> Result<Vec<Repository>> {
        Self::read_favorites(&self.store)
    }

    async fn add(&self, repo: &Repository) -> Result<()> {
        let row = repo_to_row(&repo.with_favorite(true));
        self.store
            .add_to_favorites(&row, Utc::now().timestamp_millis())?;
        info!("Favorited {}", repo.full_name);
        self.publish()
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.store.remove_from_favorites(id)?;
        info!("Unfavorited {}", id);
        self.publish()
    }

    async fn is_favorite(&self, id: i64) -> Result<bool> {
        Ok(self.store.is_favorite(id)?)
    }

    async fn search(&self, query: &str) -> Result<Vec<Repository>> {
        Ok(self
            .store
            .search_favorites(query)?
            .into_iter()
            .map(row_to_repo)
            .collect())
    }

    async fn by_id(&self, id: i64) -> Result<Option<Repository>> {
        Ok(self.store.get(id)?.map(row_to_repo))
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Repository>> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::repo;

    fn favorites() -> LocalFavorites {
        LocalFavorites::new(Arc::new(FavoritesStore::open_in_memory().unwrap())).unwrap()
    }

    #[tokio::test]
    async fn test_add_publishes_update() {
        let favs = favorites();
        let mut rx = favs.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        favs.add(&repo(1, "one")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let list = rx.borrow_and_update().clone();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_favorite);
        assert!(favs.is_favorite(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_keeps_row_for_lookup() {
        let favs = favorites();
        favs.add(&repo(1, "one")).await.unwrap();
        favs.remove(1).await.unwrap();

        assert!(favs.favorites().await.unwrap().is_empty());
        assert!(favs.subscribe().borrow().is_empty());

        let stored = favs.by_id(1).await.unwrap().unwrap();
        assert!(!stored.is_favorite);
        assert_eq!(stored.full_name, "owner/one");
    }

    #[tokio::test]
    async fn test_search_only_hits_favorites() {
        let favs = favorites();
        favs.add(&repo(1, "axum")).await.unwrap();
        favs.add(&repo(2, "actix")).await.unwrap();

        let hits = favs.search("ax").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[tokio::test]
    async fn test_initial_snapshot_comes_from_store() {
        let store = Arc::new(FavoritesStore::open_in_memory().unwrap());
        let row = repo_to_row(&repo(9, "preexisting"));
        store.add_to_favorites(&row, 10).unwrap();

        let favs = LocalFavorites::new(store).unwrap();
        assert_eq!(favs.subscribe().borrow().len(), 1);
    }
}
