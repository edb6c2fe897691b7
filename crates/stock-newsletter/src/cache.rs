//! Caching layer for market data to reduce API calls
//!
//! Several agents may ask for the same ticker within one research run (the
//! manager delegates, a worker retries), and consecutive requests often
//! research the same ticker. Results are cached per source with a TTL.

use cached::{Cached, TimedCache};
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for data source requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Ticker or query the data is about
    pub subject: String,
    /// Source or operation name
    pub endpoint: String,
    /// Additional parameters as JSON string
    pub params: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(subject: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            subject: subject.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.endpoint, self.subject, self.params)
    }
}

/// Thread-safe TTL cache shared between tool instances
pub struct DataCache<V> {
    cache: Arc<RwLock<TimedCache<CacheKey, V>>>,
}

impl<V> Clone for DataCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<V: Clone> DataCache<V> {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a live value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        // expired entries are evicted on lookup, hence the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: V) {
        let mut cache = self.cache.write().await;
        cache.cache_set(key, value);
    }

    /// Return the cached value or fetch, store and return a fresh one
    ///
    /// Errors are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(key = %key, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries (expired ones included until evicted)
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_key() {
        let key = CacheKey::new("AAPL", "price_history", json!({"start": "2023-08-08"}));
        assert_eq!(key.subject, "AAPL");
        assert!(key.params.contains("2023-08-08"));
        assert_eq!(
            key.to_string(),
            r#"price_history:AAPL:{"start":"2023-08-08"}"#
        );
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let cache: DataCache<Vec<u32>> = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "prices", json!({}));
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch(key.clone(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Vec<u32>, _>("upstream down")
            })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty().await);

        for _ in 0..2 {
            let value = cache
                .get_or_fetch(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &str>(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache: DataCache<String> = DataCache::new(Duration::from_secs(60));
        let other = cache.clone();

        cache.insert(CacheKey::new("BTC", "news", json!({})), "calm".to_string()).await;
        assert_eq!(
            other.get(&CacheKey::new("BTC", "news", json!({}))).await.as_deref(),
            Some("calm")
        );

        other.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_returned() {
        let cache: DataCache<u8> = DataCache::new(Duration::from_millis(10));
        let key = CacheKey::new("AAPL", "prices", json!({}));
        cache.insert(key.clone(), 1).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&key).await, None);
    }
}
