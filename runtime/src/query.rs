//! Cached query service.
//!
//! A [`QueryCache`] memoizes one [`Query`] per cache key. The first caller
//! for a key spawns the worker and stores its in-flight future as the entry;
//! every concurrent caller for the same key awaits that same shared future,
//! so the worker runs once and all callers receive the same `Arc`.
//!
//! Failures are never cached: the worker task removes its own entry before
//! the error is handed to any caller, so the next call starts over.
//! Entries carry a generation number; a worker only ever touches the entry
//! it created, which keeps an invalidated-then-recreated key safe from a
//! late finishing predecessor.
//!
//! [`QueryRegistry`] holds one cache per query name and is what handlers go
//! through.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use dashflow_core::query::QueryOutput;
use dashflow_core::{Query, QueryError, cache_key};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type SharedResult<T> = Shared<BoxFuture<'static, Result<Arc<T>, QueryError>>>;

struct CacheEntry<T> {
    generation: u64,
    computed_at: Option<DateTime<Utc>>,
    future: SharedResult<T>,
}

struct CacheInner<Q: Query> {
    query: Q,
    entries: Mutex<HashMap<String, CacheEntry<Q::Output>>>,
    next_generation: AtomicU64,
}

impl<Q: Query> CacheInner<Q> {
    /// Drop the entry for `key` if it still belongs to `generation`
    fn evict(&self, key: &str, generation: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|e| e.generation == generation) {
            entries.remove(key);
        }
    }

    fn mark_computed(&self, key: &str, generation: u64) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            if entry.generation == generation {
                entry.computed_at = Some(Utc::now());
            }
        }
    }
}

/// Memoizing cache for one query
///
/// Cloning yields another handle to the same cache.
///
/// # Example
///
/// ```ignore
/// let cache = QueryCache::new(MetricsAndFactsQuery::new(backend));
///
/// let (a, b) = tokio::join!(cache.query(()), cache.query(()));
/// assert!(Arc::ptr_eq(&a?, &b?));
/// ```
pub struct QueryCache<Q: Query> {
    inner: Arc<CacheInner<Q>>,
}

impl<Q: Query> Clone for QueryCache<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: Query> QueryCache<Q> {
    /// Wrap a query in an empty cache
    #[must_use]
    pub fn new(query: Q) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                query,
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Get the cached value for `params`, computing it on a miss
    ///
    /// Must be called within a Tokio runtime: a miss spawns the worker.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidParams`] when no cache key can be built,
    /// and otherwise whatever the worker failed with. A worker panic is
    /// reported as [`QueryError::Aborted`].
    #[tracing::instrument(skip_all, fields(query = Q::NAME))]
    pub async fn query(&self, params: Q::Params) -> Result<QueryOutput<Q>, QueryError> {
        let key = cache_key(&params)?;
        let future = self.entry_for(key, params);
        future.await
    }

    fn entry_for(&self, key: String, params: Q::Params) -> SharedResult<Q::Output> {
        if let Some(hit) = self.hit(&key) {
            return hit;
        }

        // Built outside the lock: `execute` may read this cache.
        let worker = self.inner.query.execute(params);

        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get(&key) {
            // Lost the race to a concurrent miss; its worker wins.
            tracing::trace!(key = %key, generation = entry.generation, "Query cache hit after miss");
            metrics::counter!("query.cache.hits", "query" => Q::NAME).increment(1);
            return entry.future.clone();
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, generation, "Query cache miss, starting worker");
        metrics::counter!("query.cache.misses", "query" => Q::NAME).increment(1);

        let task = {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            tokio::spawn(async move {
                let result = worker.await.map(Arc::new);
                match &result {
                    Ok(_) => inner.mark_computed(&key, generation),
                    Err(error) => {
                        inner.evict(&key, generation);
                        tracing::debug!(key = %key, generation, %error, "Query failed, entry evicted");
                        metrics::counter!("query.failures", "query" => Q::NAME).increment(1);
                    },
                }
                result
            })
        };

        let future = {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            async move {
                match task.await {
                    Ok(result) => result,
                    Err(join_error) => {
                        inner.evict(&key, generation);
                        Err(QueryError::Aborted(join_error.to_string()))
                    },
                }
            }
            .boxed()
            .shared()
        };

        entries.insert(
            key,
            CacheEntry {
                generation,
                computed_at: None,
                future: future.clone(),
            },
        );
        future
    }

    fn hit(&self, key: &str) -> Option<SharedResult<Q::Output>> {
        let entries = self.inner.entries.lock();
        let entry = entries.get(key)?;
        tracing::trace!(key = %key, generation = entry.generation, "Query cache hit");
        metrics::counter!("query.cache.hits", "query" => Q::NAME).increment(1);
        Some(entry.future.clone())
    }

    /// Drop the entry for `params`
    ///
    /// Callers already awaiting it still receive its result.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidParams`] when no cache key can be built.
    pub fn invalidate(&self, params: &Q::Params) -> Result<bool, QueryError> {
        let key = cache_key(params)?;
        Ok(self.inner.entries.lock().remove(&key).is_some())
    }

    /// Drop every entry
    pub fn reset(&self) {
        let mut entries = self.inner.entries.lock();
        tracing::debug!(query = Q::NAME, dropped = entries.len(), "Query cache reset");
        entries.clear();
    }

    /// Number of entries, in flight or resolved
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When the entry for `params` resolved; `None` if absent or in flight
    #[must_use]
    pub fn computed_at(&self, params: &Q::Params) -> Option<DateTime<Utc>> {
        let key = cache_key(params).ok()?;
        self.inner.entries.lock().get(&key)?.computed_at
    }
}

/// Type-erased view of a cache, for name-based management
trait ErasedCache: Send + Sync {
    fn reset(&self);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

impl<Q: Query> ErasedCache for QueryCache<Q> {
    fn reset(&self) {
        Self::reset(self);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// All query caches of an engine, by query name
#[derive(Default, Clone)]
pub struct QueryRegistry {
    caches: HashMap<&'static str, Arc<dyn ErasedCache>>,
}

impl QueryRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query under [`Query::NAME`]
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateQuery`] if the name is taken.
    pub fn register<Q: Query>(&mut self, query: Q) -> Result<(), EngineError> {
        if self.caches.contains_key(Q::NAME) {
            return Err(EngineError::DuplicateQuery(Q::NAME));
        }
        self.caches.insert(Q::NAME, Arc::new(QueryCache::new(query)));
        Ok(())
    }

    /// The cache of query `Q`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownQuery`] if `Q` was never registered.
    pub fn cache<Q: Query>(&self) -> Result<QueryCache<Q>, QueryError> {
        self.caches
            .get(Q::NAME)
            .and_then(|cache| cache.as_any().downcast_ref::<QueryCache<Q>>())
            .cloned()
            .ok_or_else(|| QueryError::UnknownQuery(Q::NAME.to_string()))
    }

    /// Run query `Q` through its cache
    ///
    /// # Errors
    ///
    /// See [`QueryCache::query`]; additionally [`QueryError::UnknownQuery`].
    pub async fn query<Q: Query>(&self, params: Q::Params) -> Result<QueryOutput<Q>, QueryError> {
        self.cache::<Q>()?.query(params).await
    }

    /// Drop every entry of the named query; `false` if no such query
    pub fn reset(&self, name: &str) -> bool {
        self.caches.get(name).is_some_and(|cache| {
            cache.reset();
            true
        })
    }

    /// Entry count of the named query
    #[must_use]
    pub fn len(&self, name: &str) -> Option<usize> {
        self.caches.get(name).map(|cache| cache.len())
    }

    /// Registered query names
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.caches.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
