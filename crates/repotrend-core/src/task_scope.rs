// Task ownership for view-state holders
use std::future::Future;
use std::sync::Mutex;
use tokio::task::{AbortHandle, JoinSet};

/// Owns background tasks and aborts them all when dropped
///
/// Each session keeps one of these, so dropping a session cancels whatever
/// it still had in flight. Finished tasks are reaped on the next spawn.
#[derive(Default)]
pub struct TaskScope {
    tasks: Mutex<JoinSet<()>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn onto the current runtime; the handle can abort just this task
    pub fn spawn<F>(&self, task: F) -> Option<AbortHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().ok()?;
        while tasks.try_join_next().is_some() {}
        Some(tasks.spawn(task))
    }

    /// Tasks that have not been reaped yet
    pub fn len(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
