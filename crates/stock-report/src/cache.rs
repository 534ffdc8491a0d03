//! Reuse of formatted tool output within a run
//!
//! Agents often ask for the same ticker twice. Entries are keyed by ticker and
//! endpoint and expire after a fixed lifespan; a hit returns exactly what the
//! miss produced.

use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Trimmed ticker as the agent passed it
    pub ticker: String,
    /// `stock_data`, `stock_financials` or `stock_news`
    pub endpoint: &'static str,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, endpoint: &'static str) -> Self {
        Self {
            ticker: ticker.into(),
            endpoint,
        }
    }
}

/// Formatted tool text shared by the market tools of one pipeline
#[derive(Clone)]
pub struct StockCache {
    // TimedCache evicts on read, so lookups need exclusive access too
    entries: Arc<Mutex<TimedCache<CacheKey, String>>>,
}

impl StockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Cached text for `key`, or the output of `fetch` stored under it
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(text) = self.entries.lock().await.cache_get(&key).cloned() {
            debug!(ticker = %key.ticker, endpoint = key.endpoint, "Reusing tool output");
            return Ok(text);
        }

        debug!(ticker = %key.ticker, endpoint = key.endpoint, "Fetching tool output");
        let text = fetch().await?;
        let _ = self.entries.lock().await.cache_set(key, text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stored(cache: &StockCache) -> usize {
        cache.entries.lock().await.cache_size()
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let cache = StockCache::new(Duration::from_secs(60));
        let mut fetches = 0;

        for answer in ["first", "second"] {
            let text = cache
                .get_or_fetch(CacheKey::new("IBM", "stock_data"), || {
                    fetches += 1;
                    async move { Ok::<_, String>(answer.to_string()) }
                })
                .await
                .unwrap();
            assert_eq!(text, "first");
        }

        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_endpoints_are_cached_separately() {
        let cache = StockCache::new(Duration::from_secs(60));

        for endpoint in ["stock_data", "stock_news"] {
            cache
                .get_or_fetch(CacheKey::new("IBM", endpoint), || async move {
                    Ok::<_, String>(endpoint.to_string())
                })
                .await
                .unwrap();
        }

        assert_eq!(stored(&cache).await, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_stored() {
        let cache = StockCache::new(Duration::from_secs(60));
        let key = CacheKey::new("NOPE", "stock_data");

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<String, _>("not found") })
            .await;
        assert!(result.is_err());
        assert_eq!(stored(&cache).await, 0);

        let result = cache
            .get_or_fetch(key, || async { Ok::<_, &str>("found".to_string()) })
            .await;
        assert_eq!(result.unwrap(), "found");
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = StockCache::new(Duration::from_millis(20));
        let key = CacheKey::new("IBM", "stock_news");

        cache
            .get_or_fetch(key.clone(), || async { Ok::<_, String>("old".to_string()) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let text = cache
            .get_or_fetch(key, || async { Ok::<_, String>("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(text, "new");
    }
}
