//! Per-key memoizing cache with single-flight loads and idle expiry.
//!
//! ```text
//! get_or_load(k) ──► DashMap shard (sync, no await) ──► Arc<CacheSlot>
//!                                                          │
//!                          OnceCell::get_or_init(loader) ◄─┘  (await outside the shard lock)
//! ```
//!
//! - Concurrent callers on the same missing key share one `OnceCell`, so exactly
//!   one loader runs and every waiter observes its result, success or failure.
//! - A failed load is handed to all of its waiters and then the slot is dropped,
//!   so the next caller starts a fresh load.
//! - Different keys live in different slots; a slow load never blocks another key.
//! - A slot not read for `expire_after_access` is replaced on the next read and
//!   removed by [`SingleFlightCache::evict_idle`].

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::StorageError;

type LoadResult<V> = std::result::Result<V, StorageError>;

struct CacheSlot<V> {
    cell: OnceCell<LoadResult<V>>,
    last_access: Mutex<Instant>,
}

impl<V> CacheSlot<V> {
    fn new(now: Instant) -> Self {
        Self {
            cell: OnceCell::new(),
            last_access: Mutex::new(now),
        }
    }

    fn touch(
        &self,
        now: Instant,
    ) {
        *self.last_access.lock() = now;
    }

    /// In-flight slots never expire; their waiters still need the result
    fn is_expired(
        &self,
        now: Instant,
        ttl: Duration,
    ) -> bool {
        self.cell.initialized() && now.saturating_duration_since(*self.last_access.lock()) >= ttl
    }

    fn loaded_value(&self) -> Option<&V> {
        match self.cell.get() {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }
}

pub struct SingleFlightCache<K, V> {
    slots: DashMap<K, Arc<CacheSlot<V>>>,
    expire_after_access: Duration,
}

impl<K, V> Debug for SingleFlightCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SingleFlightCache")
            .field("entries", &self.slots.len())
            .field("expire_after_access", &self.expire_after_access)
            .finish()
    }
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(expire_after_access: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            expire_after_access,
        }
    }

    /// Returns the cached value for `key`, running `loader` if there is none.
    ///
    /// `loader` runs at most once per slot no matter how many callers arrive
    /// while it is in flight.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: &K,
        loader: F,
    ) -> LoadResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult<V>>,
    {
        let slot = self.slot_for(key);
        let result = slot.cell.get_or_init(loader).await.clone();

        if result.is_err() {
            // Only drop the slot we failed on; a newer one may already be loading
            self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        }
        result
    }

    /// Returns the loaded value without triggering a load or refreshing access time
    pub fn peek(
        &self,
        key: &K,
    ) -> Option<V> {
        self.slots.get(key).and_then(|slot| slot.loaded_value().cloned())
    }

    /// Drops the slot for `key`. Waiters already holding it still get its result.
    pub fn invalidate(
        &self,
        key: &K,
    ) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drops the slot for `key` only if it holds a loaded value matching `predicate`.
    ///
    /// In-flight slots are left alone, so many callers that all detect the same
    /// stale value trigger one reload between them.
    pub fn invalidate_if<P>(
        &self,
        key: &K,
        predicate: P,
    ) -> bool
    where
        P: FnOnce(&V) -> bool,
    {
        self.slots
            .remove_if(key, |_, slot| slot.loaded_value().is_some_and(predicate))
            .is_some()
    }

    /// Removes every loaded slot idle for at least the expiry period; returns how many
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let ttl = self.expire_after_access;
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now, ttl));
        before.saturating_sub(self.slots.len())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_for(
        &self,
        key: &K,
    ) -> Arc<CacheSlot<V>> {
        let now = Instant::now();
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now, self.expire_after_access) {
                    let fresh = Arc::new(CacheSlot::new(now));
                    occupied.insert(fresh.clone());
                    fresh
                } else {
                    occupied.get().touch(now);
                    occupied.get().clone()
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(CacheSlot::new(now));
                vacant.insert(fresh.clone());
                fresh
            }
        }
    }
}
