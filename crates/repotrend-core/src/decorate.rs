// Re-deriving the favorite flag from the favorites store
use futures::Stream;
use std::collections::HashSet;
use tokio::sync::watch;

use crate::models::Repository;

/// Ids of the given repositories
pub fn favorite_ids(repos: &[Repository]) -> HashSet<i64> {
    repos.iter().map(|r| r.id).collect()
}

/// Set every repository's favorite flag to its membership in `favorite_ids`
///
/// Repositories that already carry the right flag are passed through as-is.
pub fn decorate_list(repos: Vec<Repository>, favorite_ids: &HashSet<i64>) -> Vec<Repository> {
    repos
        .into_iter()
        .map(|repo| {
            let is_favorite = favorite_ids.contains(&repo.id);
            if repo.is_favorite == is_favorite {
                repo
            } else {
                repo.with_favorite(is_favorite)
            }
        })
        .collect()
}

/// Combine the latest list and the latest favorite ids
///
/// Yields the current decorated list right away, then again whenever
/// either channel changes. Ends once either sender is gone.
pub fn decorate_stream(
    items: watch::Receiver<Vec<Repository>>,
    favorite_ids: watch::Receiver<HashSet<i64>>,
) -> impl Stream<Item = Vec<Repository>> + Send + 'static {
    futures::stream::unfold(
        (items, favorite_ids, true),
        |(mut items, mut ids, first)| async move {
            if !first {
                let alive = tokio::select! {
                    changed = items.changed() => changed.is_ok(),
                    changed = ids.changed() => changed.is_ok(),
                };
                if !alive {
                    return None;
                }
            }

            let current = items.borrow_and_update().clone();
            let favorites = ids.borrow_and_update().clone();
            let decorated = decorate_list(current, &favorites);
            Some((decorated, (items, ids, false)))
        },
    )
}

/// Follow a favorites list and publish its id set, only when the set changes
///
/// Returns the receiver and the future that keeps it up to date; the caller
/// decides where that future runs.
pub fn favorite_id_feed(
    mut favorites: watch::Receiver<Vec<Repository>>,
) -> (
    watch::Receiver<HashSet<i64>>,
    impl std::future::Future<Output = ()> + Send + 'static,
) {
    let initial = favorite_ids(&favorites.borrow_and_update());
    let (tx, rx) = watch::channel(initial);

    let feed = async move {
        while favorites.changed().await.is_ok() {
            let ids = favorite_ids(&favorites.borrow_and_update());
            tx.send_if_modified(|current| {
                if *current == ids {
                    false
                } else {
                    *current = ids;
                    true
                }
            });
        }
    };

    (rx, feed)
}
