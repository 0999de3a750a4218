//! Short-lived entity cache.
//!
//! Purely an optimisation in front of the entity store: a miss always falls
//! through to a remote lookup, so losing entries never changes a result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::logging::{log, obj, v_int, v_str, Domain, Level};

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CachedEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Key → value map with a fixed per-entry TTL. Cloning shares the entries.
#[derive(Debug, Clone)]
pub struct EntityCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CachedEntry<V>>>>,
}

impl<V: Clone + Send + 'static> EntityCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expired entries are never returned, even before a sweep removes them.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.into(),
                CachedEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| entry.is_fresh(ttl));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    /// Sweep on a fixed interval until every handle to the cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Mutex<HashMap<String, CachedEntry<V>>>> = Arc::downgrade(&self.entries);
        let name = self.name;
        let ttl = self.ttl;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(entries) = weak.upgrade() else {
                    break;
                };
                let cache = EntityCache { name, ttl, entries };
                let evicted = cache.sweep();
                if evicted > 0 {
                    log(
                        Level::Trace,
                        Domain::Cache,
                        "sweep",
                        obj(&[
                            ("cache", v_str(name)),
                            ("evicted", v_int(evicted as u64)),
                            ("remaining", v_int(cache.len() as u64)),
                        ]),
                    );
                }
            }
        })
    }
}
