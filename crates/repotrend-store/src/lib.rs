// SQLite-backed store for repositories and their favorite flag
pub mod store;

pub use store::{FavoritesStore, RepositoryRow, StoreError};
