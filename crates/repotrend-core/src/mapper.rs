// Conversions between wire DTOs, domain models and store rows
use chrono::{DateTime, NaiveDateTime, Utc};
use repotrend_api::{OwnerDto, RepositoryDto};
use repotrend_store::RepositoryRow;
use tracing::debug;

use crate::models::{Owner, Repository};

const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert an API repository to our model; never a favorite yet
pub fn dto_to_repo(dto: RepositoryDto) -> Repository {
    let created_at = parse_created_at(&dto.created_at);
    Repository {
        id: dto.id,
        name: dto.name,
        full_name: dto.full_name,
        description: dto.description,
        owner: dto_to_owner(dto.owner),
        stars: dto.stargazers_count,
        language: dto.language,
        forks: dto.forks_count,
        created_at,
        html_url: dto.html_url,
        is_favorite: false,
    }
}

pub fn dto_to_owner(dto: OwnerDto) -> Owner {
    Owner {
        id: dto.id,
        login: dto.login,
        avatar_url: dto.avatar_url,
    }
}

/// Timestamps we can't read fall back to "now" rather than failing the page
pub fn parse_created_at(raw: &str) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, API_DATE_FORMAT) {
        return naive.and_utc();
    }
    debug!("Unparseable created_at '{}', using current time", raw);
    Utc::now()
}

/// Store projection of a repository; the favorited timestamp is set by the store
pub fn repo_to_row(repo: &Repository) -> RepositoryRow {
    RepositoryRow {
        id: repo.id,
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        description: repo.description.clone(),
        owner_id: repo.owner.id,
        owner_login: repo.owner.login.clone(),
        owner_avatar_url: repo.owner.avatar_url.clone(),
        stargazers_count: repo.stars,
        language: repo.language.clone(),
        forks_count: repo.forks,
        created_at: repo.created_at.timestamp_millis(),
        html_url: repo.html_url.clone(),
        is_favorite: repo.is_favorite,
        added_to_favorites_at: None,
    }
}

pub fn row_to_repo(row: RepositoryRow) -> Repository {
    Repository {
        id: row.id,
        name: row.name,
        full_name: row.full_name,
        description: row.description,
        owner: Owner {
            id: row.owner_id,
            login: row.owner_login,
            avatar_url: row.owner_avatar_url,
        },
        stars: row.stargazers_count,
        language: row.language,
        forks: row.forks_count,
        created_at: DateTime::from_timestamp_millis(row.created_at).unwrap_or_else(Utc::now),
        html_url: row.html_url,
        is_favorite: row.is_favorite,
    }
}
