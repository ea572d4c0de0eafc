// Implementations of the data-source traits
pub mod github;
pub mod local;

pub use github::GitHubSource;
pub use local::LocalFavorites;
