// View-state holders: observable state, human-readable errors, scoped tasks
pub mod detail;
pub mod favorites;
pub mod trending;

pub use detail::{DataSource, DetailSession, DetailState};
pub use favorites::{FavoritesSession, FavoritesState};
pub use trending::{TrendingSession, TrendingState};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Tracks the newest request of one kind so older ones can't publish
///
/// `begin` aborts whatever is still running and hands out a ticket; a task
/// writes its results through `Ticket::publish`.
#[derive(Default)]
pub(crate) struct Latest {
    generation: Arc<AtomicU64>,
    running: Mutex<Option<AbortHandle>>,
}

impl Latest {
    pub(crate) fn begin(&self) -> Ticket {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut running) = self.running.lock() {
            if let Some(previous) = running.take() {
                previous.abort();
            }
        }
        Ticket {
            generation: self.generation.clone(),
            id,
        }
    }

    pub(crate) fn track(&self, handle: Option<AbortHandle>) {
        if let Ok(mut running) = self.running.lock() {
            *running = handle;
        }
    }
}

pub(crate) struct Ticket {
    generation: Arc<AtomicU64>,
    id: u64,
}

impl Ticket {
    pub(crate) fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.id
    }

    /// Apply `write` only if no newer request started; the check runs under
    /// the state lock. Returns whether anything was written.
    pub(crate) fn publish<T>(&self, state: &watch::Sender<T>, write: impl FnOnce(&mut T)) -> bool {
        state.send_if_modified(|current| {
            if !self.is_current() {
                return false;
            }
            write(current);
            true
        })
    }
}
