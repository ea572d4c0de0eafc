// Favorites screen state
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::Latest;
use crate::{
    models::Repository,
    task_scope::TaskScope,
    usecases::{GetFavoriteRepositories, RemoveFromFavorites, SearchFavorites, Services},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesState {
    pub favorites: Vec<Repository>,
    pub is_loading: bool,
    pub search_query: String,
    pub is_searching: bool,
    pub search_results: Vec<Repository>,
    pub error: Option<String>,
}

pub struct FavoritesSession {
    search: Arc<SearchFavorites>,
    remove: RemoveFromFavorites,
    state: Arc<watch::Sender<FavoritesState>>,
    latest_search: Latest,
    scope: TaskScope,
}

impl FavoritesSession {
    /// Loads the favorites and keeps following them; needs a Tokio runtime
    pub fn new(services: &Services) -> Self {
        let (state, _) = watch::channel(FavoritesState {
            is_loading: true,
            ..FavoritesState::default()
        });
        let state = Arc::new(state);
        let scope = TaskScope::new();

        let get = GetFavoriteRepositories::new(services);
        let observer = state.clone();
        scope.spawn(async move {
            let mut updates = get.execute();

            match get.snapshot().await {
                Ok(favorites) => observer.send_modify(|s| {
                    s.favorites = favorites;
                    s.is_loading = false;
                }),
                Err(e) => {
                    warn!("Loading favorites failed: {}", e);
                    observer.send_modify(|s| {
                        s.is_loading = false;
                        s.error = Some(format!("Failed to load favorites: {}", e));
                    });
                }
            }

            while updates.changed().await.is_ok() {
                let favorites = updates.borrow_and_update().clone();
                observer.send_modify(|s| s.favorites = favorites);
            }
        });

        Self {
            search: Arc::new(SearchFavorites::new(services)),
            remove: RemoveFromFavorites::new(services),
            state,
            latest_search: Latest::default(),
            scope,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FavoritesState {
        self.state.borrow().clone()
    }

    /// Blank clears the results; anything else replaces whatever search is in flight
    pub fn update_search_query(&self, query: &str) {
        let ticket = self.latest_search.begin();
        let query = query.to_string();
        let blank = query.trim().is_empty();

        self.state.send_modify(|s| {
            s.search_query = query.clone();
            s.is_searching = !blank;
            if blank {
                s.search_results.clear();
            }
        });

        if blank {
            self.latest_search.track(None);
            return;
        }

        let search = self.search.clone();
        let state = self.state.clone();
        let handle = self.scope.spawn(async move {
            let outcome = search.execute(&query).await;
            ticket.publish(&state, |s| {
                s.is_searching = false;
                match outcome {
                    Ok(found) => s.search_results = found,
                    Err(e) => s.error = Some(format!("Search failed: {}", e)),
                }
            });
        });
        self.latest_search.track(handle);
    }

    pub async fn remove_from_favorites(&self, repo: &Repository) {
        if let Err(e) = self.remove.execute(repo.id).await {
            warn!("Removing {} from favorites failed: {}", repo.full_name, e);
            self.state.send_modify(|s| {
                s.error = Some(format!("Failed to remove from favorites: {}", e))
            });
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FavoritesSource, MockRemoteSource};
    use crate::test_support::{in_memory_favorites, repo};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn wait_until(
        session: &FavoritesSession,
        done: impl FnMut(&FavoritesState) -> bool,
    ) -> FavoritesState {
        let mut rx = session.subscribe();
        let state = timeout(Duration::from_secs(2), rx.wait_for(done))
            .await
            .expect("state never reached")
            .unwrap()
            .clone();
        state
    }

    fn services(favorites: Arc<dyn FavoritesSource>) -> Services {
        Services::new(Arc::new(MockRemoteSource::new()), favorites)
    }

    #[tokio::test]
    async fn test_loads_and_follows_favorites() {
        let favorites: Arc<dyn FavoritesSource> = Arc::new(in_memory_favorites());
        favorites.add(&repo(1, "one")).await.unwrap();

        let session = FavoritesSession::new(&services(favorites.clone()));
        let state = wait_until(&session, |s| !s.is_loading).await;
        assert_eq!(state.favorites.len(), 1);

        favorites.add(&repo(2, "two")).await.unwrap();
        let state = wait_until(&session, |s| s.favorites.len() == 2).await;
        // Most recently favorited first
        assert_eq!(state.favorites[0].id, 2);
        assert!(state.favorites.iter().all(|r| r.is_favorite));

        session.remove_from_favorites(&state.favorites[0]).await;
        wait_until(&session, |s| s.favorites.len() == 1).await;
    }

    #[tokio::test]
    async fn test_search_and_clear() {
        let favorites: Arc<dyn FavoritesSource> = Arc::new(in_memory_favorites());
        favorites.add(&repo(1, "tokio")).await.unwrap();
        favorites.add(&repo(2, "serde")).await.unwrap();

        let session = FavoritesSession::new(&services(favorites));
        session.update_search_query("tok");

        let state = wait_until(&session, |s| !s.is_searching && !s.search_results.is_empty()).await;
        assert_eq!(state.search_results.len(), 1);
        assert_eq!(state.search_results[0].id, 1);

        session.update_search_query("");
        let state = session.state();
        assert!(state.search_results.is_empty());
        assert!(!state.is_searching);
    }

    /// Favorites source whose every call fails
    struct Broken {
        updates: watch::Sender<Vec<Repository>>,
    }

    impl Broken {
        fn new() -> Self {
            Self {
                updates: watch::channel(Vec::new()).0,
            }
        }
    }

    fn broken() -> Error {
        Error::StoreError("disk gone".into())
    }

    #[async_trait]
    impl FavoritesSource for Broken {
        async fn favorites(&self) -> Result<Vec<Repository>> {
            Err(broken())
        }
        async fn add(&self, _: &Repository) -> Result<()> {
            Err(broken())
        }
        async fn remove(&self, _: i64) -> Result<()> {
            Err(broken())
        }
        async fn is_favorite(&self, _: i64) -> Result<bool> {
            Err(broken())
        }
        async fn search(&self, _: &str) -> Result<Vec<Repository>> {
            Err(broken())
        }
        async fn by_id(&self, _: i64) -> Result<Option<Repository>> {
            Err(broken())
        }
        fn subscribe(&self) -> watch::Receiver<Vec<Repository>> {
            self.updates.subscribe()
        }
    }

    #[tokio::test]
    async fn test_error_messages() {
        let session = FavoritesSession::new(&services(Arc::new(Broken::new())));

        let state = wait_until(&session, |s| !s.is_loading).await;
        assert_eq!(
            state.error.as_deref(),
            Some("Failed to load favorites: Storage operation failed: disk gone")
        );

        session.remove_from_favorites(&repo(1, "one")).await;
        assert_eq!(
            session.state().error.as_deref(),
            Some("Failed to remove from favorites: Storage operation failed: disk gone")
        );

        session.clear_error();
        session.update_search_query("x");
        let state = wait_until(&session, |s| s.error.is_some()).await;
        assert_eq!(
            state.error.as_deref(),
            Some("Search failed: Storage operation failed: disk gone")
        );
        assert!(!state.is_searching);
    }
}
