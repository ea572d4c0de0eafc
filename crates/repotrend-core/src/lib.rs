// Core business logic lives here - the brain of the operation
pub mod config;
pub mod decorate;
pub mod error;
pub mod mapper;
pub mod models;
pub mod paging;
pub mod providers;
pub mod query;
pub mod session;
pub mod source;
pub mod task_scope;
pub mod usecases;

#[cfg(test)]
mod test_support;

pub use config::{Config, TrendingMode};
pub use error::Error;
pub use models::{Owner, Repository, TimeFrame, DEFAULT_DESCRIPTION};
pub use paging::{LoadState, Pager, PagingConfig};
pub use providers::{GitHubSource, LocalFavorites};
pub use session::{
    DataSource, DetailSession, DetailState, FavoritesSession, FavoritesState, TrendingSession,
    TrendingState,
};
pub use source::{FavoritesSource, RemoteSource};
pub use task_scope::TaskScope;
pub use usecases::Services;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
