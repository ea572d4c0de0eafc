use repotrend_api::GitHubError;
use repotrend_store::StoreError;
use thiserror::Error;

/// All the ways things can go wrong in RepoTrend
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Storage operation failed: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { reset_at: Option<i64> },

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::NotFound(what) => Error::NotFound(what),
            GitHubError::RateLimitExceeded { reset_at } => Error::RateLimitExceeded { reset_at },
            GitHubError::AuthRequired => Error::AuthError("token missing or rejected".to_string()),
            GitHubError::RequestFailed { status, body } => {
                Error::ApiError(format!("Status {}: {}", status, body))
            }
            other => Error::ApiError(other.to_string()),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::StoreError(err.to_string())
    }
}
