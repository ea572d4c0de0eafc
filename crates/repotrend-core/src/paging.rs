// Page-by-page loading with prefetch
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::{
    models::{Repository, TimeFrame},
    source::RemoteSource,
    Result,
};

/// Shared id -> repository cache, filled by every loaded page
pub type RepositoryCache = Arc<Mutex<HashMap<i64, Repository>>>;

pub fn new_cache() -> RepositoryCache {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Look up a cached repository, ignoring a poisoned lock
pub fn cached(cache: &RepositoryCache, id: i64) -> Option<Repository> {
    cache.lock().ok().and_then(|c| c.get(&id).cloned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub page_size: u32,
    pub prefetch_distance: usize,
    pub initial_page: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            prefetch_distance: 3,
            initial_page: 1,
        }
    }
}

/// One loaded page and the keys of its neighbours
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Repository>,
    pub prev_key: Option<u32>,
    pub next_key: Option<u32>,
}

impl Page {
    /// Page 1 has no previous page; an empty page ends the list
    pub fn from_items(page: u32, items: Vec<Repository>) -> Self {
        let prev_key = if page <= 1 { None } else { Some(page - 1) };
        let next_key = if items.is_empty() { None } else { Some(page + 1) };
        Self {
            items,
            prev_key,
            next_key,
        }
    }

    /// The key this page was loaded with
    pub fn key(&self) -> Option<u32> {
        self.prev_key
            .map(|p| p + 1)
            .or_else(|| self.next_key.map(|n| n - 1))
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, page: u32, page_size: u32) -> Result<Page>;
}

/// Trending pages for one time frame
pub struct TrendingPageSource {
    remote: Arc<dyn RemoteSource>,
    frame: TimeFrame,
    cache: RepositoryCache,
}

impl TrendingPageSource {
    pub fn new(remote: Arc<dyn RemoteSource>, frame: TimeFrame, cache: RepositoryCache) -> Self {
        Self {
            remote,
            frame,
            cache,
        }
    }

    pub fn time_frame(&self) -> TimeFrame {
        self.frame
    }
}

#[async_trait]
impl PageSource for TrendingPageSource {
    async fn load(&self, page: u32, page_size: u32) -> Result<Page> {
        let items = self.remote.trending_page(self.frame, page, page_size).await?;

        if let Ok(mut cache) = self.cache.lock() {
            for repo in &items {
                cache.insert(repo.id, repo.clone());
            }
        }

        Ok(Page::from_items(page, items))
    }
}

/// Where the pager is at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle { end_reached: bool },
    Loading,
    Error(String),
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::Idle { end_reached: false }
    }
}

/// Appends pages from a `PageSource` as the reader moves down the list
pub struct Pager<S> {
    source: S,
    config: PagingConfig,
    pages: Vec<Page>,
    next_key: Option<u32>,
    state: LoadState,
}

impl<S: PageSource> Pager<S> {
    pub fn new(source: S, config: PagingConfig) -> Self {
        Self {
            source,
            config,
            pages: Vec::new(),
            next_key: Some(config.initial_page),
            state: LoadState::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of loaded items
    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.next_key.is_some()
    }

    /// All loaded items in order
    pub fn items(&self) -> Vec<Repository> {
        self.pages
            .iter()
            .flat_map(|p| p.items.iter().cloned())
            .collect()
    }

    /// Load the next page. `Ok(false)` when the end was already reached.
    ///
    /// A failure keeps the loaded pages and the pending key, so `retry`
    /// asks for the same page again.
    pub async fn load_next(&mut self) -> Result<bool> {
        let Some(key) = self.next_key else {
            return Ok(false);
        };

        self.state = LoadState::Loading;
        debug!("Loading page {}", key);

        match self.source.load(key, self.config.page_size).await {
            Ok(page) => {
                self.next_key = page.next_key;
                self.state = LoadState::Idle {
                    end_reached: self.next_key.is_none(),
                };
                if !page.items.is_empty() {
                    self.pages.push(page);
                }
                Ok(true)
            }
            Err(e) => {
                warn!("Page {} failed to load: {}", key, e);
                self.state = LoadState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Re-attempt the page that failed; no-op unless the last load failed
    pub async fn retry(&mut self) -> Result<bool> {
        if matches!(self.state, LoadState::Error(_)) {
            self.load_next().await
        } else {
            Ok(false)
        }
    }

    /// Drop everything and start again from the first page
    pub async fn refresh(&mut self) -> Result<bool> {
        self.pages.clear();
        self.next_key = Some(self.config.initial_page);
        self.state = LoadState::default();
        self.load_next().await
    }

    /// True when a reader at `index` is within `prefetch_distance` of the
    /// end and another page can be loaded
    pub fn should_prefetch(&self, index: usize) -> bool {
        self.has_more()
            && matches!(self.state, LoadState::Idle { .. })
            && index + self.config.prefetch_distance >= self.len()
    }

    /// Keep loading until the reader at `index` is comfortably covered
    pub async fn ensure_loaded(&mut self, index: usize) -> Result<()> {
        while self.should_prefetch(index) {
            self.load_next().await?;
        }
        Ok(())
    }

    /// Key of the page holding item `anchor`, for reloading around a position
    pub fn refresh_key(&self, anchor: usize) -> Option<u32> {
        let mut seen = 0;
        for page in &self.pages {
            seen += page.items.len();
            if anchor < seen {
                return page.key();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockRemoteSource;
    use crate::test_support::repo;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves `total` numbered items, failing the first `fail_first` calls
    struct Numbers {
        total: u32,
        fail_first: u32,
        calls: AtomicU32,
    }

    impl Numbers {
        fn new(total: u32) -> Self {
            Self {
                total,
                fail_first: 0,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for Numbers {
        async fn load(&self, page: u32, page_size: u32) -> Result<Page> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(Error::ApiError("flaky".into()));
            }
            let start = (page - 1) * page_size;
            let end = (start + page_size).min(self.total);
            let items = (start..end)
                .map(|i| repo(i as i64, &format!("r{}", i)))
                .collect();
            Ok(Page::from_items(page, items))
        }
    }

    fn small_config() -> PagingConfig {
        PagingConfig {
            page_size: 2,
            prefetch_distance: 1,
            initial_page: 1,
        }
    }

    #[test]
    fn test_page_keys() {
        let first = Page::from_items(1, vec![repo(1, "a")]);
        assert_eq!(first.prev_key, None);
        assert_eq!(first.next_key, Some(2));
        assert_eq!(first.key(), Some(1));

        let last = Page::from_items(4, vec![]);
        assert_eq!(last.prev_key, Some(3));
        assert_eq!(last.next_key, None);
        assert_eq!(last.key(), Some(4));
    }

    #[tokio::test]
    async fn test_loads_until_empty_page() {
        let mut pager = Pager::new(Numbers::new(5), small_config());

        assert!(pager.load_next().await.unwrap());
        assert!(pager.load_next().await.unwrap());
        assert!(pager.load_next().await.unwrap());
        assert_eq!(pager.len(), 5);
        assert!(pager.has_more());

        // Page 4 is empty and ends the list
        assert!(pager.load_next().await.unwrap());
        assert!(!pager.has_more());
        assert_eq!(pager.load_state(), &LoadState::Idle { end_reached: true });
        assert!(!pager.load_next().await.unwrap());
        assert_eq!(pager.pages().len(), 3);
    }

    #[tokio::test]
    async fn test_should_prefetch_near_end() {
        let mut pager = Pager::new(Numbers::new(10), small_config());
        assert!(pager.should_prefetch(0));

        pager.load_next().await.unwrap();
        // 2 items loaded, distance 1
        assert!(!pager.should_prefetch(0));
        assert!(pager.should_prefetch(1));

        pager.ensure_loaded(5).await.unwrap();
        assert_eq!(pager.len(), 8);
        assert!(!pager.should_prefetch(5));
    }

    #[tokio::test]
    async fn test_failure_keeps_pages_and_retry_reloads_same_key() {
        let source = Numbers {
            total: 6,
            fail_first: 0,
            calls: AtomicU32::new(0),
        };
        let mut pager = Pager::new(source, small_config());
        pager.load_next().await.unwrap();

        // Make the next call fail once
        pager.source.fail_first = 2;

        assert!(pager.load_next().await.is_err());
        assert!(matches!(pager.load_state(), LoadState::Error(msg) if msg.contains("flaky")));
        assert_eq!(pager.len(), 2);
        assert!(!pager.should_prefetch(1));

        assert!(pager.retry().await.unwrap());
        assert_eq!(pager.len(), 4);
        assert_eq!(pager.items()[2].id, 2);
    }

    #[tokio::test]
    async fn test_retry_is_noop_without_error() {
        let mut pager = Pager::new(Numbers::new(4), small_config());
        assert!(!pager.retry().await.unwrap());
        assert!(pager.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_starts_over() {
        let mut pager = Pager::new(Numbers::new(6), small_config());
        pager.ensure_loaded(3).await.unwrap();
        assert!(pager.len() >= 4);

        pager.refresh().await.unwrap();
        assert_eq!(pager.len(), 2);
        assert_eq!(pager.items()[0].id, 0);
    }

    #[tokio::test]
    async fn test_refresh_key_finds_anchor_page() {
        let mut pager = Pager::new(Numbers::new(6), small_config());
        pager.ensure_loaded(4).await.unwrap();

        assert_eq!(pager.refresh_key(0), Some(1));
        assert_eq!(pager.refresh_key(3), Some(2));
        assert_eq!(pager.refresh_key(5), Some(3));
        assert_eq!(pager.refresh_key(50), None);
    }

    #[tokio::test]
    async fn test_trending_source_fills_cache() {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_trending_page()
            .withf(|frame, page, per_page| *frame == TimeFrame::Week && *page == 1 && *per_page == 30)
            .times(1)
            .returning(|_, _, _| Ok(vec![repo(10, "ten"), repo(11, "eleven")]));

        let cache = new_cache();
        let source = TrendingPageSource::new(Arc::new(remote), TimeFrame::Week, cache.clone());
        let mut pager = Pager::new(source, PagingConfig::default());

        pager.load_next().await.unwrap();

        assert_eq!(pager.len(), 2);
        assert_eq!(cached(&cache, 11).unwrap().name, "eleven");
        assert!(cached(&cache, 12).is_none());
    }
}
