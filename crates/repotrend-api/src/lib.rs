// HTTP client for the code-forge REST API
pub mod dto;
pub mod github;
pub mod retry;

// Re-export common types
pub use dto::{OwnerDto, RepositoryDto, SearchResponseDto};
pub use github::{GitHubClient, GitHubError, SearchParams};
pub use retry::RetryConfig;
