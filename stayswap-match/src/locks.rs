use crate::error::SwapError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = Arc<StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

/// Per-swap async mutexes.
///
/// Mutating operations lock every swap they touch, in sorted id order so two
/// operations over overlapping pairs can never deadlock. Acquisition waits a
/// bounded time; on timeout the caller gets `ConcurrentModification` and is
/// expected to re-fetch and retry.
///
/// Map entries are evicted once the last holder releases them, so the map
/// stays proportional to the swaps currently contended, not to every swap
/// ever locked.
#[derive(Clone, Default)]
pub struct SwapLocks {
    inner: LockMap,
}

impl SwapLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn acquire(&self, ids: &[Uuid], wait: Duration) -> Result<SwapGuard, SwapError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for &id in &ids {
            let handle = self.handle(id);
            match tokio::time::timeout(wait, handle.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    // Release what was acquired so far before reporting the
                    // timeout, then drop the orphaned entries.
                    guards.clear();
                    evict_unused(&self.inner, &ids);
                    return Err(SwapError::ConcurrentModification);
                }
            }
        }
        Ok(SwapGuard {
            guards,
            ids,
            registry: self.inner.clone(),
        })
    }
}

/// Drop map entries nobody references anymore. A waiter or holder keeps a
/// clone of the entry's Arc, so a strong count of one means only the map
/// itself still points at it.
fn evict_unused(registry: &LockMap, ids: &[Uuid]) {
    let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
    for id in ids {
        if map.get(id).is_some_and(|m| Arc::strong_count(m) == 1) {
            map.remove(id);
        }
    }
}

/// Holds the acquired swap locks until dropped, then evicts the map entries
/// that no other operation is holding or waiting on.
pub struct SwapGuard {
    guards: Vec<OwnedMutexGuard<()>>,
    ids: Vec<Uuid>,
    registry: LockMap,
}

impl Drop for SwapGuard {
    fn drop(&mut self) {
        // The owned guards keep the entry Arcs alive; release them first so
        // the strong count reflects only the map and any waiters.
        self.guards.clear();
        evict_unused(&self.registry, &self.ids);
    }
}
