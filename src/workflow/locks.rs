// file: src/workflow/locks.rs
// description: keyed mutual exclusion per (identity, repository) working copy
// reference: https://docs.rs/tokio/latest/tokio/sync/struct.Mutex.html

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RepoKey {
    identity: String,
    repo: String,
}

/// Serializes mutating operations on one working copy. Operations on
/// different repositories never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct RepositoryLocks {
    inner: Arc<Mutex<HashMap<RepoKey, Arc<AsyncMutex<()>>>>>,
}

impl RepositoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access; released when the guard drops.
    pub async fn acquire(&self, identity: &str, repo: &str) -> OwnedMutexGuard<()> {
        let key = RepoKey {
            identity: identity.to_string(),
            repo: repo.to_string(),
        };

        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map are idle.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(key).or_default())
        };

        debug!("Waiting for lock on {}/{}", identity, repo);
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
