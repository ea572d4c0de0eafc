// Shared fixtures for unit tests
use chrono::Utc;
use repotrend_store::FavoritesStore;
use std::sync::Arc;

use crate::models::{Owner, Repository};
use crate::providers::LocalFavorites;

pub fn repo(id: i64, name: &str) -> Repository {
    Repository {
        id,
        name: name.to_string(),
        full_name: format!("owner/{}", name),
        description: Some(format!("{} description", name)),
        owner: Owner {
            id: 1,
            login: "owner".to_string(),
            avatar_url: None,
        },
        stars: 10,
        language: Some("Rust".to_string()),
        forks: 2,
        created_at: Utc::now(),
        html_url: format!("https://github.com/owner/{}", name),
        is_favorite: false,
    }
}

pub fn in_memory_favorites() -> LocalFavorites {
    LocalFavorites::new(Arc::new(FavoritesStore::open_in_memory().unwrap())).unwrap()
}
