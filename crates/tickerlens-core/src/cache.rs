//! Short-lived in-memory cache scoped to one session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// How a single lookup interacts with the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve a live entry if present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Always fetch and leave the cache untouched.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

/// Cloneable handle to a TTL map. Clones share entries.
///
/// A zero TTL disables the cache: writes are dropped and reads always miss.
#[derive(Debug)]
pub struct CacheStore<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> CacheStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let store = self.inner.read().await;
        store
            .map
            .get(key)
            .filter(|entry| Instant::now() <= entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` and drops every entry that has expired.
    pub async fn put(&self, key: impl Into<String>, value: V) {
        let mut store = self.inner.write().await;
        if store.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        store.map.retain(|_, entry| entry.expires_at > now);
        let expires_at = now + store.ttl;
        store.map.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_overwrites_values() {
        let cache = CacheStore::new(Duration::from_secs(1));

        assert!(cache.get("AAPL").await.is_none());

        cache.put("AAPL", 1_u32).await;
        assert_eq!(cache.get("AAPL").await, Some(1));

        cache.put("AAPL", 2_u32).await;
        assert_eq!(cache.get("AAPL").await, Some(2));
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = CacheStore::new(Duration::from_millis(50));

        cache.put("TCS.NS", "snapshot").await;
        assert!(cache.get("TCS.NS").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("TCS.NS").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let cache = CacheStore::new(Duration::from_millis(5));
        for day in 0..100 {
            cache.put(format!("AAPL|{day}"), day).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.put("MSFT|0", 0).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("MSFT|0").await, Some(0));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = CacheStore::new(Duration::from_secs(60));
        let handle = cache.clone();

        handle.put("INFY.NS", 7_i32).await;
        assert_eq!(cache.get("INFY.NS").await, Some(7));
        assert_eq!(handle.len().await, 1);
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let cache = CacheStore::<String>::disabled();

        cache.put("AAPL", String::from("value")).await;
        assert!(cache.get("AAPL").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn cache_mode_flags() {
        assert_eq!(CacheMode::default(), CacheMode::Use);
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}
