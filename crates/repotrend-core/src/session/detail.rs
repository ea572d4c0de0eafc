// Single repository view: local store first, then the server
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::Latest;
use crate::{
    models::Repository,
    task_scope::TaskScope,
    usecases::{
        AddToFavorites, GetRepositoryById, GetRepositoryByIdFromServer, RemoveFromFavorites,
        Services,
    },
};

pub const NOT_FOUND_MESSAGE: &str = "Repository not found locally or on server";

/// Where the shown repository came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataSource {
    Local,
    Server,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub repository: Option<Repository>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub data_source: DataSource,
}

pub struct DetailSession {
    local: Arc<GetRepositoryById>,
    server: Arc<GetRepositoryByIdFromServer>,
    add: AddToFavorites,
    remove: RemoveFromFavorites,
    state: Arc<watch::Sender<DetailState>>,
    latest_load: Latest,
    scope: TaskScope,
}

impl DetailSession {
    pub fn new(services: &Services) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            local: Arc::new(GetRepositoryById::new(services)),
            server: Arc::new(GetRepositoryByIdFromServer::new(services)),
            add: AddToFavorites::new(services),
            remove: RemoveFromFavorites::new(services),
            state: Arc::new(state),
            latest_load: Latest::default(),
            scope: TaskScope::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Start loading `id` in the background; a later call replaces this one
    ///
    /// `is_loading` is set before returning, so waiting for it to clear
    /// observes the outcome.
    pub fn load_repository(&self, id: i64) {
        let ticket = self.latest_load.begin();
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let local = self.local.clone();
        let server = self.server.clone();
        let state = self.state.clone();

        let handle = self.scope.spawn(async move {
            let outcome = match local.execute(id).await {
                Ok(Some(repo)) => Ok(Some((repo, DataSource::Local))),
                Ok(None) => {
                    debug!("{} not stored locally, asking the server", id);
                    server
                        .execute(id)
                        .await
                        .map(|found| found.map(|repo| (repo, DataSource::Server)))
                }
                Err(e) => Err(e),
            };

            ticket.publish(&state, |s| {
                s.is_loading = false;
                match outcome {
                    Ok(Some((repo, source))) => {
                        s.repository = Some(repo);
                        s.data_source = source;
                    }
                    Ok(None) => s.error = Some(NOT_FOUND_MESSAGE.to_string()),
                    Err(e) => {
                        warn!("Loading repository {} failed: {}", id, e);
                        s.error = Some(format!("Failed to load repository: {}", e));
                    }
                }
            });
        });
        self.latest_load.track(handle);
    }

    /// Flip the favorite flag; the shown repository follows on success
    pub async fn toggle_favorite(&self, repo: &Repository) {
        let (result, action) = if repo.is_favorite {
            (self.remove.execute(repo.id).await, "remove from")
        } else {
            (self.add.execute(repo).await, "add to")
        };

        match result {
            Ok(()) => self.state.send_modify(|s| {
                if let Some(shown) = s.repository.as_mut() {
                    shown.is_favorite = !repo.is_favorite;
                }
            }),
            Err(e) => {
                warn!("Favorite toggle for {} failed: {}", repo.full_name, e);
                self.state
                    .send_modify(|s| s.error = Some(format!("Failed to {} favorites: {}", action, e)));
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}
