// Trending list, search box and favorite toggling for one screen
use futures::Stream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::Latest;
use crate::{
    decorate::{decorate_list, favorite_id_feed},
    models::{Repository, TimeFrame},
    paging::{LoadState, Pager, TrendingPageSource},
    task_scope::TaskScope,
    usecases::{
        AddToFavorites, DecorateListWithFavorites, DecorateWithFavorites, GetTrendingRepositories,
        RemoveFromFavorites, SearchRepositories, Services,
    },
    Result,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendingState {
    pub time_frame: TimeFrame,
    /// Loaded trending pages, decorated
    pub repositories: Vec<Repository>,
    pub load_state: LoadState,
    pub search_query: String,
    pub is_searching: bool,
    /// Results for `search_query`, decorated
    pub search_results: Vec<Repository>,
    pub error: Option<String>,
}

pub struct TrendingSession {
    trending: GetTrendingRepositories,
    search: Arc<SearchRepositories>,
    add: AddToFavorites,
    remove: RemoveFromFavorites,
    pager: Mutex<Pager<TrendingPageSource>>,
    /// Loaded pages as fetched, before decoration
    pages: watch::Sender<Vec<Repository>>,
    favorite_ids: watch::Receiver<HashSet<i64>>,
    state: Arc<watch::Sender<TrendingState>>,
    latest_search: Latest,
    scope: TaskScope,
}

impl TrendingSession {
    /// Must be created inside a Tokio runtime; favorite changes are followed in the background
    pub fn new(services: Services) -> Self {
        let trending = GetTrendingRepositories::new(services.clone());
        let pager = trending.execute(TimeFrame::default());

        let (pages, _) = watch::channel(Vec::new());
        let (state, _) = watch::channel(TrendingState::default());
        let state = Arc::new(state);

        let scope = TaskScope::new();
        let (favorite_ids, feed) = favorite_id_feed(services.favorites.subscribe());
        scope.spawn(feed);
        scope.spawn(redecorate_on_change(favorite_ids.clone(), state.clone()));

        Self {
            search: Arc::new(SearchRepositories::new(&services)),
            add: AddToFavorites::new(&services),
            remove: RemoveFromFavorites::new(&services),
            trending,
            pager: Mutex::new(pager),
            pages,
            favorite_ids,
            state,
            latest_search: Latest::default(),
            scope,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrendingState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TrendingState {
        self.state.borrow().clone()
    }

    /// Loaded trending items with the current favorite flags
    pub fn repositories(&self) -> Vec<Repository> {
        self.state.borrow().repositories.clone()
    }

    /// Search results with the current favorite flags
    pub fn search_results(&self) -> Vec<Repository> {
        self.state.borrow().search_results.clone()
    }

    /// Decorated trending list, re-emitted whenever pages or favorites change
    pub fn repository_stream(&self) -> impl Stream<Item = Vec<Repository>> + Send + 'static {
        DecorateWithFavorites.execute(self.pages.subscribe(), self.favorite_ids.clone())
    }

    /// Switch to `frame` and load its first page
    ///
    /// Selecting the frame that is already loaded does nothing.
    pub async fn select_time_frame(&self, frame: TimeFrame) {
        let mut pager = self.pager.lock().await;
        if pager.source().time_frame() == frame && !pager.is_empty() {
            return;
        }

        debug!("Switching trending list to {}", frame);
        *pager = self.trending.execute(frame);
        self.state.send_modify(|s| {
            self.pages.send_replace(Vec::new());
            s.repositories.clear();
            s.time_frame = frame;
            s.load_state = LoadState::Loading;
        });

        let result = pager.load_next().await;
        self.publish_pages(&pager, result);
    }

    /// Append the next page, if there is one
    pub async fn load_more(&self) {
        let mut pager = self.pager.lock().await;
        if !pager.has_more() {
            return;
        }
        self.state.send_modify(|s| s.load_state = LoadState::Loading);
        let result = pager.load_next().await;
        self.publish_pages(&pager, result);
    }

    /// Called as the reader reaches item `index`; loads ahead when close to the end
    pub async fn prefetch(&self, index: usize) {
        let mut pager = self.pager.lock().await;
        if !pager.should_prefetch(index) {
            return;
        }
        let result = pager.load_next().await;
        self.publish_pages(&pager, result);
    }

    /// Load the page that failed last time again
    pub async fn retry(&self) {
        let mut pager = self.pager.lock().await;
        let result = pager.retry().await;
        self.publish_pages(&pager, result);
    }

    /// Reload the current frame from the first page
    pub async fn refresh(&self) {
        let mut pager = self.pager.lock().await;
        let result = pager.refresh().await;
        self.publish_pages(&pager, result);
    }

    /// Items and load state land in one update
    fn publish_pages(&self, pager: &Pager<TrendingPageSource>, result: Result<bool>) {
        let items = pager.items();
        let load_state = pager.load_state().clone();
        let error = result
            .err()
            .map(|e| format!("Failed to load repositories: {}", e));

        self.state.send_modify(|s| {
            s.repositories =
                DecorateListWithFavorites.execute(items.clone(), &self.favorite_ids.borrow());
            self.pages.send_replace(items);
            s.load_state = load_state;
            if error.is_some() {
                s.error = error;
            }
        });
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

        let frame = self.state.borrow().time_frame;
        let search = self.search.clone();
        let favorite_ids = self.favorite_ids.clone();
        let state = self.state.clone();

        let handle = self.scope.spawn(async move {
            let outcome = search.execute(&query, frame).await;
            ticket.publish(&state, |s| {
                s.is_searching = false;
                match outcome {
                    Ok(found) => {
                        debug!("Search '{}' found {} repositories", query, found.len());
                        s.search_results = decorate_list(found, &favorite_ids.borrow());
                    }
                    Err(e) => {
                        warn!("Search '{}' failed: {}", query, e);
                        s.error = Some(format!("Search failed: {}", e));
                    }
                }
            });
        });
        self.latest_search.track(handle);
    }

    /// Favorite or unfavorite; the new flag shows up through decoration
    pub async fn toggle_favorite(&self, repo: &Repository) {
        let result = if repo.is_favorite {
            self.remove.execute(repo.id).await
        } else {
            self.add.execute(repo).await
        };

        if let Err(e) = result {
            warn!("Favorite toggle for {} failed: {}", repo.full_name, e);
            self.state
                .send_modify(|s| s.error = Some(format!("Failed to update favorite: {}", e)));
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}

/// Re-flag the shown lists whenever the favorite ids change
///
/// The ids are read under the state lock, so a concurrent publish never
/// leaves older flags behind.
async fn redecorate_on_change(
    mut favorite_ids: watch::Receiver<HashSet<i64>>,
    state: Arc<watch::Sender<TrendingState>>,
) {
    while favorite_ids.changed().await.is_ok() {
        state.send_modify(|s| {
            let ids = favorite_ids.borrow_and_update();
            s.repositories = decorate_list(std::mem::take(&mut s.repositories), &ids);
            s.search_results = decorate_list(std::mem::take(&mut s.search_results), &ids);
        });
    }
}
