//! Bounded, time-expiring cache of project metadata.
//!
//! Items from the same project share one lookup. Entries expire after
//! `PROJECT_CACHE_TTL`; once more than `PROJECT_CACHE_CAPACITY` are stored the
//! least recently used entry is evicted (expired entries go first).
//!
//! The lock only guards the map. A miss releases it before fetching, so
//! lookups for different projects never wait on each other's network call.
//! Two concurrent misses for the same id both fetch; the later insert wins.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::constants::{PROJECT_CACHE_CAPACITY, PROJECT_CACHE_TTL};
use crate::error::ReviewError;
use crate::models::Project;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

struct LruState<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Monotonic use counter; higher means more recently used
    tick: u64,
}

/// LRU map whose entries also expire after a fixed TTL.
pub struct ExpiringLru<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> ExpiringLru<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity,
            ttl,
        }
    }

    /// Unexpired value for `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        let expired = match state.entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = tick;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        state.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
                last_used: tick,
            },
        );

        if state.entries.len() > self.capacity {
            state.entries.retain(|_, entry| entry.expires_at > now);
        }

        while state.entries.len() > self.capacity {
            let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }
}

/// Project metadata keyed by backend project id.
pub struct ProjectCache {
    entries: ExpiringLru<u64, Project>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::with_limits(PROJECT_CACHE_CAPACITY, PROJECT_CACHE_TTL)
    }

    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: ExpiringLru::new(capacity, ttl),
        }
    }

    /// Cached project, or the result of `fetch` stored for later lookups.
    pub async fn get_or_fetch<F, Fut>(&self, project_id: u64, fetch: F) -> Result<Project, ReviewError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Project, ReviewError>>,
    {
        if let Some(project) = self.entries.get(&project_id) {
            trace!(project_id, "project cache hit");
            return Ok(project);
        }

        trace!(project_id, "project cache miss");
        let project = fetch().await?;
        self.entries.insert(project_id, project.clone());
        Ok(project)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, project_id: u64) -> bool {
        self.entries.contains(&project_id)
    }
}

impl Default for ProjectCache {
    fn default() -> Self {
        Self::new()
    }
}
