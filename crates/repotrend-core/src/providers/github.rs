// GitHub provider implementation - bridges API client with RemoteSource trait
use async_trait::async_trait;
use chrono::Utc;
use repotrend_api::{GitHubClient, GitHubError, SearchParams};
use tracing::debug;

use crate::{
    config::{GitHubConfig, TrendingMode},
    mapper::dto_to_repo,
    models::{Repository, TimeFrame},
    query::search_query,
    source::RemoteSource,
    Result,
};

/// Wrapper around GitHubClient that implements RemoteSource
pub struct GitHubSource {
    client: GitHubClient,
    trending_mode: TrendingMode,
}

impl GitHubSource {
    pub fn new(client: GitHubClient, trending_mode: TrendingMode) -> Self {
        Self {
            client,
            trending_mode,
        }
    }

    pub fn from_config(config: &GitHubConfig, trending_mode: TrendingMode) -> Result<Self> {
        let client = GitHubClient::with_base_url(config.token.clone(), &config.api_url)?;
        Ok(Self::new(client, trending_mode))
    }

    async fn search_window(
        &self,
        text: &str,
        frame: TimeFrame,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        let query = search_query(text, frame, Utc::now().date_naive());
        let params = SearchParams::new(query).page(page).per_page(per_page);
        let response = self.client.search_repositories(&params).await?;
        debug!(
            "Search page {} returned {} of {} results",
            page,
            response.items.len(),
            response.total_count
        );
        Ok(response.items.into_iter().map(dto_to_repo).collect())
    }
}

#[async_trait]
impl RemoteSource for GitHubSource {
    async fn search(
        &self,
        query: &str,
        frame: TimeFrame,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.search_window(query, frame, page, per_page).await
    }

    async fn trending_page(
        &self,
        frame: TimeFrame,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        match self.trending_mode {
            TrendingMode::Search => self.search_window("", frame, page, per_page).await,
            TrendingMode::Listing => {
                let repos = self
                    .client
                    .trending_repositories(frame.listing_key(), page, per_page)
                    .await?;
                Ok(repos.into_iter().map(dto_to_repo).collect())
            }
        }
    }

    async fn repository_by_id(&self, id: i64) -> Result<Option<Repository>> {
        match self.client.get_repository_by_id(id).await {
            Ok(dto) => Ok(Some(dto_to_repo(dto))),
            Err(GitHubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
