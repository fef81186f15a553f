use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::models::{ActionRow, GroupPermission, PermissionInstance, Row};

/// A value held by the lookup cache. Values are cached by value: they are
/// cloned on the way in and on the way out, so mutating a returned value
/// never affects the cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Text(String),
    Integer(i64),
    Row(Row),
    Permission(PermissionInstance),
    Groups(Vec<GroupPermission>),
    Action(ActionRow),
}

impl CacheValue {
    /// A hit of the wrong variant is treated as a miss: log and re-read from
    /// the database.
    pub fn into_text(self, key: &str) -> Option<String> {
        match self {
            CacheValue::Text(v) => Some(v),
            other => mismatch(key, "text", &other),
        }
    }

    pub fn into_integer(self, key: &str) -> Option<i64> {
        match self {
            CacheValue::Integer(v) => Some(v),
            other => mismatch(key, "integer", &other),
        }
    }

    pub fn into_row(self, key: &str) -> Option<Row> {
        match self {
            CacheValue::Row(v) => Some(v),
            other => mismatch(key, "row", &other),
        }
    }

    pub fn into_permission(self, key: &str) -> Option<PermissionInstance> {
        match self {
            CacheValue::Permission(v) => Some(v),
            other => mismatch(key, "permission", &other),
        }
    }

    pub fn into_groups(self, key: &str) -> Option<Vec<GroupPermission>> {
        match self {
            CacheValue::Groups(v) => Some(v),
            other => mismatch(key, "groups", &other),
        }
    }

    pub fn into_action(self, key: &str) -> Option<ActionRow> {
        match self {
            CacheValue::Action(v) => Some(v),
            other => mismatch(key, "action", &other),
        }
    }
}

fn mismatch<T>(key: &str, expected: &str, found: &CacheValue) -> Option<T> {
    warn!(
        message = "Malformed cached value, treating as miss",
        key = key,
        expected = expected,
        found = ?std::mem::discriminant(found),
    );
    None
}

/// Distributed key-value store with per-entry TTL and put-if-absent
/// semantics. When the backing store is unavailable `get` returns a miss and
/// `put_if_absent` is a no-op; the system degrades to direct database reads.
pub trait LookupCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheValue>;
    fn put_if_absent(&self, key: &str, value: CacheValue, ttl: Duration);
}

/// Miss-only cache, the default when no store is configured.
#[derive(Debug, Default)]
pub struct NullCache;

impl LookupCache for NullCache {
    fn get(&self, _key: &str) -> Option<CacheValue> {
        None
    }

    fn put_if_absent(&self, _key: &str, _value: CacheValue, _ttl: Duration) {}
}

/// In-process TTL store. Expired entries are dropped on access and pruned
/// when the map grows past the prune threshold.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (CacheValue, Instant)>>,
    prune_threshold: usize,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache {
            entries: Mutex::new(HashMap::new()),
            prune_threshold: 4096,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        MemoryCache::new()
    }
}

impl LookupCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheValue> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(message = "Cache unavailable", error = %e);
                return None;
            }
        };
        let expired = match entries.get(key) {
            Some((_, expires)) => *expires <= Instant::now(),
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }

    fn put_if_absent(&self, key: &str, value: CacheValue, ttl: Duration) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(message = "Cache unavailable", error = %e);
                return;
            }
        };
        let now = Instant::now();
        if entries.len() >= self.prune_threshold {
            entries.retain(|_, (_, expires)| *expires > now);
        }
        let fresh = matches!(entries.get(key), Some((_, expires)) if *expires > now);
        if !fresh {
            entries.insert(key.to_string(), (value, now + ttl));
        }
    }
}
