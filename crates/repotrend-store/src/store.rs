use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One row of the `repositories` table
///
/// Timestamps are UTC epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRow {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub owner_login: String,
    pub owner_avatar_url: Option<String>,
    pub stargazers_count: u32,
    pub language: Option<String>,
    pub forks_count: u32,
    pub created_at: i64,
    pub html_url: String,
    pub is_favorite: bool,
    pub added_to_favorites_at: Option<i64>,
}

const COLUMNS: &str = "id, name, full_name, description, owner_id, owner_login, \
     owner_avatar_url, stargazers_count, language, forks_count, created_at, \
     html_url, is_favorite, added_to_favorites_at";

/// Favorites store on top of a single SQLite table
///
/// The connection sits behind a mutex so the store can be shared between
/// tasks. Every call is a short local query.
pub struct FavoritesStore {
    conn: Mutex<Connection>,
}

impl FavoritesStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        debug!("Opened favorites store at {}", db_path.as_ref().display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                full_name TEXT NOT NULL,
                description TEXT,
                owner_id INTEGER NOT NULL,
                owner_login TEXT NOT NULL,
                owner_avatar_url TEXT,
                stargazers_count INTEGER NOT NULL,
                language TEXT,
                forks_count INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                html_url TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                added_to_favorites_at INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_repositories_favorite
             ON repositories(is_favorite, added_to_favorites_at)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// All favorites, most recently favorited first
    pub fn favorites(&self) -> Result<Vec<RepositoryRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM repositories
             WHERE is_favorite = 1
             ORDER BY added_to_favorites_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], read_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Favorites whose name, full name or description contains `query`
    pub fn search_favorites(&self, query: &str) -> Result<Vec<RepositoryRow>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM repositories
             WHERE is_favorite = 1
               AND (name LIKE ?1 ESCAPE '\\'
                    OR full_name LIKE ?1 ESCAPE '\\'
                    OR description LIKE ?1 ESCAPE '\\')
             ORDER BY added_to_favorites_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![pattern], read_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Unknown ids are simply not favorites
    pub fn is_favorite(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let flag: Option<bool> = conn
            .query_row(
                "SELECT is_favorite FROM repositories WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.unwrap_or(false))
    }

    pub fn favorite_ids(&self) -> Result<HashSet<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM repositories WHERE is_favorite = 1")?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        Ok(ids.collect::<rusqlite::Result<HashSet<_>>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<RepositoryRow>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM repositories WHERE id = ?1"),
                params![id],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or replace a row
    pub fn upsert(&self, row: &RepositoryRow) -> Result<()> {
        let conn = self.lock()?;
        write_row(&conn, row)?;
        Ok(())
    }

    /// Store the repository and mark it as a favorite at `at` (epoch millis)
    pub fn add_to_favorites(&self, row: &RepositoryRow, at: i64) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_row(&tx, row)?;
        tx.execute(
            "UPDATE repositories SET is_favorite = 1, added_to_favorites_at = ?2 WHERE id = ?1",
            params![row.id, at],
        )?;
        tx.commit()?;
        debug!("Added {} to favorites", row.full_name);
        Ok(())
    }

    /// Clear the favorite flag; the row itself stays
    pub fn remove_from_favorites(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE repositories SET is_favorite = 0, added_to_favorites_at = NULL WHERE id = ?1",
            params![id],
        )?;
        debug!("Removed {} from favorites", id);
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Drop every row that isn't a favorite, returns how many went away
    pub fn clear_non_favorites(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM repositories WHERE is_favorite = 0", [])?;
        Ok(removed)
    }
}

fn write_row(conn: &Connection, row: &RepositoryRow) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO repositories ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            row.id,
            row.name,
            row.full_name,
            row.description,
            row.owner_id,
            row.owner_login,
            row.owner_avatar_url,
            row.stargazers_count,
            row.language,
            row.forks_count,
            row.created_at,
            row.html_url,
            row.is_favorite,
            row.added_to_favorites_at,
        ],
    )
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RepositoryRow> {
    Ok(RepositoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        full_name: row.get(2)?,
        description: row.get(3)?,
        owner_id: row.get(4)?,
        owner_login: row.get(5)?,
        owner_avatar_url: row.get(6)?,
        stargazers_count: row.get(7)?,
        language: row.get(8)?,
        forks_count: row.get(9)?,
        created_at: row.get(10)?,
        html_url: row.get(11)?,
        is_favorite: row.get(12)?,
        added_to_favorites_at: row.get(13)?,
    })
}

/// `%` and `_` in user input must match literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
