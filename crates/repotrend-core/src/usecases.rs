// One struct per user-facing operation, wired from `Services`
use futures::Stream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    decorate::{decorate_list, decorate_stream},
    models::{Repository, TimeFrame},
    paging::{cached, new_cache, Pager, PagingConfig, RepositoryCache, TrendingPageSource},
    source::{FavoritesSource, RemoteSource},
    Result,
};

/// Everything the use cases need, cheap to clone
#[derive(Clone)]
pub struct Services {
    pub remote: Arc<dyn RemoteSource>,
    pub favorites: Arc<dyn FavoritesSource>,
    pub cache: RepositoryCache,
    pub paging: PagingConfig,
}

impl Services {
    pub fn new(remote: Arc<dyn RemoteSource>, favorites: Arc<dyn FavoritesSource>) -> Self {
        Self {
            remote,
            favorites,
            cache: new_cache(),
            paging: PagingConfig::default(),
        }
    }

    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }
}

pub struct GetTrendingRepositories {
    services: Services,
}

impl GetTrendingRepositories {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// A fresh pager over the trending list for `frame`
    pub fn execute(&self, frame: TimeFrame) -> Pager<TrendingPageSource> {
        let source = TrendingPageSource::new(
            self.services.remote.clone(),
            frame,
            self.services.cache.clone(),
        );
        Pager::new(source, self.services.paging)
    }
}

pub struct SearchRepositories {
    remote: Arc<dyn RemoteSource>,
    per_page: u32,
}

impl SearchRepositories {
    pub fn new(services: &Services) -> Self {
        Self {
            remote: services.remote.clone(),
            per_page: services.paging.page_size,
        }
    }

    pub async fn execute(&self, query: &str, frame: TimeFrame) -> Result<Vec<Repository>> {
        self.execute_page(query, frame, 1).await
    }

    pub async fn execute_page(
        &self,
        query: &str,
        frame: TimeFrame,
        page: u32,
    ) -> Result<Vec<Repository>> {
        self.remote.search(query, frame, page, self.per_page).await
    }
}

pub struct GetFavoriteRepositories {
    favorites: Arc<dyn FavoritesSource>,
}

impl GetFavoriteRepositories {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    /// Live favorites list
    pub fn execute(&self) -> watch::Receiver<Vec<Repository>> {
        self.favorites.subscribe()
    }

    /// One-off read
    pub async fn snapshot(&self) -> Result<Vec<Repository>> {
        self.favorites.favorites().await
    }
}

pub struct AddToFavorites {
    favorites: Arc<dyn FavoritesSource>,
}

impl AddToFavorites {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    pub async fn execute(&self, repo: &Repository) -> Result<()> {
        self.favorites.add(repo).await
    }
}

pub struct RemoveFromFavorites {
    favorites: Arc<dyn FavoritesSource>,
}

impl RemoveFromFavorites {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    pub async fn execute(&self, id: i64) -> Result<()> {
        self.favorites.remove(id).await
    }
}

pub struct IsFavorite {
    favorites: Arc<dyn FavoritesSource>,
}

impl IsFavorite {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    pub async fn execute(&self, id: i64) -> Result<bool> {
        self.favorites.is_favorite(id).await
    }
}

pub struct SearchFavorites {
    favorites: Arc<dyn FavoritesSource>,
}

impl SearchFavorites {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    pub async fn execute(&self, query: &str) -> Result<Vec<Repository>> {
        self.favorites.search(query).await
    }
}

/// Lookup in the local store
pub struct GetRepositoryById {
    favorites: Arc<dyn FavoritesSource>,
}

impl GetRepositoryById {
    pub fn new(services: &Services) -> Self {
        Self {
            favorites: services.favorites.clone(),
        }
    }

    pub async fn execute(&self, id: i64) -> Result<Option<Repository>> {
        self.favorites.by_id(id).await
    }
}

/// Lookup on the server, answered from the page cache when possible
pub struct GetRepositoryByIdFromServer {
    remote: Arc<dyn RemoteSource>,
    cache: RepositoryCache,
}

impl GetRepositoryByIdFromServer {
    pub fn new(services: &Services) -> Self {
        Self {
            remote: services.remote.clone(),
            cache: services.cache.clone(),
        }
    }

    pub async fn execute(&self, id: i64) -> Result<Option<Repository>> {
        if let Some(repo) = cached(&self.cache, id) {
            debug!("Page cache hit for {}", id);
            return Ok(Some(repo));
        }
        self.remote.repository_by_id(id).await
    }
}

#[derive(Default)]
pub struct DecorateWithFavorites;

impl DecorateWithFavorites {
    pub fn execute(
        &self,
        items: watch::Receiver<Vec<Repository>>,
        favorite_ids: watch::Receiver<HashSet<i64>>,
    ) -> impl Stream<Item = Vec<Repository>> + Send + 'static {
        decorate_stream(items, favorite_ids)
    }
}

#[derive(Default)]
pub struct DecorateListWithFavorites;

impl DecorateListWithFavorites {
    pub fn execute(&self, repos: Vec<Repository>, favorite_ids: &HashSet<i64>) -> Vec<Repository> {
        decorate_list(repos, favorite_ids)
    }
}
