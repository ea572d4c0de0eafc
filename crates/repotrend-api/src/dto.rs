use serde::{Deserialize, Serialize};

/// Repository as the API returns it
///
/// `created_at` is kept as the raw string; the core crate decides what to
/// do with timestamps it can't parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDto {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: OwnerDto,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub created_at: String,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerDto {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Envelope of `GET /search/repositories`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponseDto {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<RepositoryDto>,
}
