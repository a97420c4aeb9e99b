//! Keyed query cache with in-flight deduplication and invalidation.
//!
//! Entries carry a generation number. Invalidation bumps it and detaches
//! any in-flight fetch, so a result that was computed from data older than
//! the invalidation is never installed; the caller re-fetches instead.

pub mod invalidation;
pub mod key;

use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ClientError;

pub use invalidation::affected_kinds;
pub use key::{CacheKey, EntityKind};

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, ClientError>>>;

struct InFlight {
    id: u64,
    generation: u64,
    future: SharedFetch,
}

struct Entry {
    value: Option<CachedValue>,
    stale: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    generations: u64,
}

impl Inner {
    fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }

    fn entry(&mut self, key: &CacheKey) -> &mut Entry {
        let Inner { entries, generations } = self;
        entries.entry(key.clone()).or_insert_with(|| {
            *generations += 1;
            Entry {
                value: None,
                stale: false,
                generation: *generations,
                in_flight: None,
            }
        })
    }
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
    fetch_ids: Arc<AtomicU64>,
    max_superseded: u32,
}

impl QueryCache {
    pub fn new(max_superseded_refetches: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            fetch_ids: Arc::new(AtomicU64::new(0)),
            max_superseded: max_superseded_refetches,
        }
    }

    /// Return the cached value for `key`, or run `loader` to produce it.
    ///
    /// Concurrent calls for the same key share one loader run. A loader
    /// result that lands after an invalidation of its key is discarded and
    /// the loader is run again, up to the configured number of times.
    pub async fn fetch<T, F, Fut>(&self, key: CacheKey, loader: F) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let mut superseded = 0;
        loop {
            let (future, fetch_id, generation) = {
                let mut inner = self.inner.lock().await;
                let entry = inner.entry(&key);

                if !entry.stale {
                    if let Some(value) = entry.value.as_ref().and_then(|v| v.downcast_ref::<T>()) {
                        return Ok(value.clone());
                    }
                }

                let joinable = entry
                    .in_flight
                    .as_ref()
                    .filter(|flight| flight.generation == entry.generation)
                    .map(|flight| (flight.future.clone(), flight.id, flight.generation));

                match joinable {
                    Some(joined) => {
                        debug!(%key, "joining in-flight fetch");
                        joined
                    }
                    None => {
                        let id = self.fetch_ids.fetch_add(1, Ordering::Relaxed);
                        let load = loader();
                        let future = async move { load.await.map(|v| Arc::new(v) as CachedValue) }
                            .boxed()
                            .shared();
                        entry.in_flight = Some(InFlight {
                            id,
                            generation: entry.generation,
                            future: future.clone(),
                        });
                        debug!(%key, fetch = id, "fetching");
                        (future, id, entry.generation)
                    }
                }
            };

            let result = future.await;

            let mut inner = self.inner.lock().await;
            let entry = inner.entry(&key);
            if entry.in_flight.as_ref().map(|f| f.id) == Some(fetch_id) {
                entry.in_flight = None;
            }

            if entry.generation != generation {
                if superseded < self.max_superseded {
                    superseded += 1;
                    debug!(%key, fetch = fetch_id, "result superseded by invalidation, refetching");
                    continue;
                }
                debug!(%key, fetch = fetch_id, "refetch limit reached, returning uninstalled result");
                return result.and_then(downcast::<T>);
            }

            let value = result?;
            entry.value = Some(value.clone());
            entry.stale = false;
            return downcast(value);
        }
    }

    /// Mark every entry selected by `prefix` stale; returns how many matched
    pub async fn invalidate(&self, prefix: &CacheKey) -> usize {
        let mut inner = self.inner.lock().await;
        let keys: Vec<CacheKey> = inner.entries.keys().filter(|k| k.matches(prefix)).cloned().collect();
        for key in &keys {
            let generation = inner.next_generation();
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.stale = true;
                entry.generation = generation;
                entry.in_flight = None;
            }
        }
        debug!(prefix = %prefix, matched = keys.len(), "invalidated");
        keys.len()
    }

    pub async fn invalidate_kinds(&self, kinds: &[EntityKind]) -> usize {
        let mut total = 0;
        for kind in kinds {
            total += self.invalidate(&CacheKey::new(*kind)).await;
        }
        total
    }

    /// `None` when the key has never been fetched
    pub async fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        let inner = self.inner.lock().await;
        inner.entries.get(key).map(|e| e.stale)
    }

    pub async fn is_in_flight(&self, key: &CacheKey) -> bool {
        let inner = self.inner.lock().await;
        inner.entries.get(key).map(|e| e.in_flight.is_some()).unwrap_or(false)
    }

    /// Last installed value, stale or not
    pub async fn peek<T: Clone + 'static>(&self, key: &CacheKey) -> Option<T> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .and_then(|e| e.value.as_ref())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        debug!("cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn downcast<T: Clone + 'static>(value: CachedValue) -> Result<T, ClientError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ClientError::Internal("cached value has unexpected type".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn counting_loader(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<'static, Result<Vec<i64>, ClientError>> {
        move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(vec![n])
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let cache = QueryCache::new(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(EntityKind::Products);

        let (a, b) = tokio::join!(
            cache.fetch(key.clone(), counting_loader(calls.clone())),
            cache.fetch(key.clone(), counting_loader(calls.clone())),
        );
        assert_eq!(a.unwrap(), vec![0]);
        assert_eq!(b.unwrap(), vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_value_served_from_cache() {
        let cache = QueryCache::new(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(EntityKind::Units);

        cache.fetch(key.clone(), counting_loader(calls.clone())).await.unwrap();
        let again = cache.fetch(key.clone(), counting_loader(calls.clone())).await.unwrap();
        assert_eq!(again, vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidated_entry_refetched() {
        let cache = QueryCache::new(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::with_query(EntityKind::Products, &crate::api::Query::new().push("limit", 100));

        cache.fetch(key.clone(), counting_loader(calls.clone())).await.unwrap();
        assert_eq!(cache.invalidate(&EntityKind::Products.into()).await, 1);
        assert_eq!(cache.is_stale(&key).await, Some(true));
        // Stale value stays visible until the refetch lands
        assert_eq!(cache.peek::<Vec<i64>>(&key).await, Some(vec![0]));

        let value = cache.fetch(key.clone(), counting_loader(calls.clone())).await.unwrap();
        assert_eq!(value, vec![1]);
        assert_eq!(cache.is_stale(&key).await, Some(false));
    }

    #[tokio::test]
    async fn test_invalidation_of_other_kind_leaves_entry_fresh() {
        let cache = QueryCache::new(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(EntityKind::Users);
        cache.fetch(key.clone(), counting_loader(calls)).await.unwrap();

        assert_eq!(cache.invalidate_kinds(&[EntityKind::Products, EntityKind::Meals]).await, 0);
        assert_eq!(cache.is_stale(&key).await, Some(false));
    }

    #[tokio::test]
    async fn test_result_overtaken_by_invalidation_is_not_installed() {
        let cache = QueryCache::new(3);
        let key = CacheKey::new(EntityKind::AvailableMeals);
        let calls = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let loader = {
            let calls = calls.clone();
            let release = release.clone();
            move || {
                let calls = calls.clone();
                let release = release.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        // First request holds pre-update data until released
                        release.notified().await;
                        Ok::<_, ClientError>("before".to_string())
                    } else {
                        Ok("after".to_string())
                    }
                }
            }
        };

        let reader = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(key, loader).await })
        };

        while !cache.is_in_flight(&key).await {
            tokio::task::yield_now().await;
        }
        cache.invalidate(&EntityKind::AvailableMeals.into()).await;
        release.notify_one();

        let shown = reader.await.unwrap().unwrap();
        assert_eq!(shown, "after");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek::<String>(&key).await.as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn test_refetch_limit_bounds_retries() {
        let cache = QueryCache::new(0);
        let key = CacheKey::new(EntityKind::Servings);
        let release = Arc::new(Notify::new());

        let loader = {
            let release = release.clone();
            move || {
                let release = release.clone();
                async move {
                    release.notified().await;
                    Ok::<_, ClientError>(1_u8)
                }
            }
        };

        let reader = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(key, loader).await })
        };
        while !cache.is_in_flight(&key).await {
            tokio::task::yield_now().await;
        }
        cache.invalidate(&key).await;
        release.notify_one();

        assert_eq!(reader.await.unwrap().unwrap(), 1);
        // Returned but never installed
        assert_eq!(cache.peek::<u8>(&key).await, None);
        assert_eq!(cache.is_stale(&key).await, Some(true));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_value() {
        let cache = QueryCache::new(3);
        let key = CacheKey::new(EntityKind::Meals);
        cache
            .fetch(key.clone(), || async { Ok::<_, ClientError>(vec!["palov".to_string()]) })
            .await
            .unwrap();
        cache.invalidate(&key).await;

        let err = cache
            .fetch(key.clone(), || async {
                Err::<Vec<String>, _>(ClientError::Network("connection reset".to_string()))
            })
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(cache.peek::<Vec<String>>(&key).await, Some(vec!["palov".to_string()]));
        assert_eq!(cache.is_stale(&key).await, Some(true));
    }
}
