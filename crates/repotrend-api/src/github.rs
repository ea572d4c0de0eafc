use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::dto::{RepositoryDto, SearchResponseDto};
use crate::retry::{is_retryable_status, with_retry_when, RetryConfig};

const GITHUB_API_BASE: &str = "https://api.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_PER_PAGE: u32 = 30;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: Status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded { reset_at: Option<i64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl GitHubError {
    /// Transport failures and transient server statuses are worth another try.
    /// Everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            GitHubError::NetworkError(_) => true,
            GitHubError::RequestFailed { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Parameters of `GET /search/repositories`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub sort: String,
    pub order: String,
    pub page: u32,
    pub per_page: u32,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sort: "stars".to_string(),
            order: "desc".to_string(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.query.clone()),
            ("sort", self.sort.clone()),
            ("order", self.order.clone()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE)
    }

    /// For GitHub Enterprise or any API-compatible mirror
    pub fn with_base_url(token: Option<String>, base_url: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("RepoTrend/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search repositories
    pub async fn search_repositories(&self, params: &SearchParams) -> Result<SearchResponseDto> {
        let url = format!("{}/search/repositories", self.base_url);
        debug!(query = %params.query, page = params.page, "searching repositories");
        self.get_json(&url, &params.to_query()).await
    }

    /// Trending listing for a window (`daily`, `weekly`, `monthly`)
    pub async fn trending_repositories(
        &self,
        since: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RepositoryDto>> {
        let url = format!("{}/trending", self.base_url);
        debug!(since, page, "fetching trending listing");
        let query = vec![
            ("since", since.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        self.get_json(&url, &query).await
    }

    /// Get a single repository by its numeric id
    pub async fn get_repository_by_id(&self, id: i64) -> Result<RepositoryDto> {
        let url = format!("{}/repositories/{}", self.base_url, id);
        self.get_json(&url, &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        with_retry_when(&self.retry_config, GitHubError::is_retryable, || async move {
            self.send_once(url, query).await
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let mut request = self.client.get(url).query(query);

        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(url.to_string()));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(GitHubError::AuthRequired);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limited(&response) {
            return Err(GitHubError::RateLimitExceeded {
                reset_at: header_i64(&response, "x-ratelimit-reset"),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// GitHub answers an exhausted quota with 403 and a zero remaining header
fn is_rate_limited(response: &reqwest::Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && header_i64(response, "x-ratelimit-remaining") == Some(0)
}

fn header_i64(response: &reqwest::Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_json(id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "full_name": format!("owner/{}", name),
            "description": "desc",
            "owner": {"id": 7, "login": "owner", "avatar_url": null},
            "stargazers_count": 100,
            "language": "Rust",
            "forks_count": 5,
            "created_at": "2024-05-01T12:00:00Z",
            "html_url": format!("https://github.com/owner/{}", name)
        })
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    async fn client_for(server: &MockServer, token: Option<&str>) -> GitHubClient {
        GitHubClient::with_base_url(token.map(String::from), &server.uri())
            .unwrap()
            .with_retry_config(fast_retry())
    }

    #[tokio::test]
    async fn test_search_sends_all_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "rust created:2024-05-01..2024-05-02"))
            .and(query_param("sort", "stars"))
            .and(query_param("order", "desc"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "incomplete_results": false,
                "items": [repo_json(1, "alpha")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let params = SearchParams::new("rust created:2024-05-01..2024-05-02").page(2);
        let response = client.search_repositories(&params).await.unwrap();

        assert_eq!(response.total_count, 1);
        assert_eq!(response.items[0].name, "alpha");
    }

    #[tokio::test]
    async fn test_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repositories/42"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_json(42, "answer")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret")).await;
        let repo = client.get_repository_by_id(42).await.unwrap();
        assert_eq!(repo.id, 42);
    }

    #[tokio::test]
    async fn test_trending_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trending"))
            .and(query_param("since", "weekly"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json(1, "a"), repo_json(2, "b")])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let repos = client.trending_repositories("weekly", 1, 30).await.unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].full_name, "owner/b");
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repositories/9"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client.get_repository_by_id(9).await.unwrap_err();
        assert!(matches!(err, GitHubError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repositories/5"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repositories/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_json(5, "five")))
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let repo = client.get_repository_by_id(5).await.unwrap();
        assert_eq!(repo.name, "five");
    }

    #[tokio::test]
    async fn test_persistent_server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client
            .search_repositories(&SearchParams::new("x"))
            .await
            .unwrap_err();

        match err {
            GitHubError::RequestFailed { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_quota_maps_to_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client
            .search_repositories(&SearchParams::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GitHubError::RateLimitExceeded {
                reset_at: Some(1700000000)
            }
        ));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("expired")).await;
        let err = client.get_repository_by_id(1).await.unwrap_err();
        assert!(matches!(err, GitHubError::AuthRequired));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repositories/3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let err = client.get_repository_by_id(3).await.unwrap_err();
        assert!(matches!(err, GitHubError::ParseError(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = GitHubClient::with_base_url(None, "https://example.test/api/").unwrap();
        assert_eq!(client.base_url(), "https://example.test/api");
    }

    #[test]
    fn test_search_params_defaults() {
        let params = SearchParams::new("q");
        assert_eq!(params.sort, "stars");
        assert_eq!(params.order, "desc");
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 30);
    }
}
