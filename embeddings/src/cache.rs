//! Single-flight embedding cache.
//!
//! Entries live for the lifetime of the cache and are never evicted.
//! Concurrent requests for the same key share one in-flight computation;
//! a failed computation is handed to every waiter and then forgotten, so
//! the next request starts over. A computation that panics is forgotten the
//! same way, and the panic is resumed in every waiter.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Embedding;

/// Outcome of a computation; `Err` holds the message of a panic.
type Outcome<E> = std::result::Result<Result<Arc<Embedding>, E>, Arc<str>>;

type Pending<E> = Shared<BoxFuture<'static, Outcome<E>>>;

enum Slot<E> {
    Ready(Arc<Embedding>),
    Computing { generation: u64, future: Pending<E> },
}

/// Cache of embeddings keyed by `K`, with computation errors of type `E`.
pub struct EmbeddingCache<K, E> {
    // Held only for map lookups and updates, never across an await.
    slots: Mutex<HashMap<K, Slot<E>>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    joined: AtomicU64,
    computations: AtomicU64,
}

impl<K, E> EmbeddingCache<K, E>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<K, Slot<E>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached embedding for `key`, or run `compute` to produce it.
    ///
    /// `compute` is only invoked when no entry and no in-flight computation
    /// exists for `key`. Callers arriving while a computation is running
    /// wait for it and receive its outcome.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<Arc<Embedding>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Embedding, E>> + Send + 'static,
    {
        let (generation, future) = {
            let mut slots = self.slots();
            match slots.get(&key) {
                Some(Slot::Ready(embedding)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for {key:?}");
                    return Ok(Arc::clone(embedding));
                }
                Some(Slot::Computing { generation, future }) => {
                    self.joined.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight computation for {key:?}");
                    (*generation, future.clone())
                }
                None => {
                    self.computations.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache miss for {key:?}, computing");
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let future = AssertUnwindSafe(compute())
                        .catch_unwind()
                        .map(|caught| match caught {
                            Ok(result) => Ok(result.map(Arc::new)),
                            Err(payload) => Err(panic_message(payload.as_ref())),
                        })
                        .boxed()
                        .shared();
                    slots.insert(
                        key.clone(),
                        Slot::Computing {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (generation, future)
                }
            }
        };

        match future.await {
            Ok(result) => {
                self.settle(&key, generation, result.as_ref().ok());
                result
            }
            Err(message) => {
                self.settle(&key, generation, None);
                warn!("Computation for {key:?} panicked: {message}");
                std::panic::resume_unwind(Box::new(message.to_string()))
            }
        }
    }

    /// Replace the in-flight slot with its embedding, or drop it when the
    /// computation produced none. Every waiter calls this; only the first
    /// one for a given generation has an effect.
    fn settle(&self, key: &K, generation: u64, embedding: Option<&Arc<Embedding>>) {
        let mut slots = self.slots();
        let current = matches!(
            slots.get(key),
            Some(Slot::Computing { generation: g, .. }) if *g == generation
        );
        if !current {
            return;
        }
        match embedding {
            Some(embedding) => {
                slots.insert(key.clone(), Slot::Ready(Arc::clone(embedding)));
            }
            None => {
                debug!("Computation for {key:?} failed, not caching");
                slots.remove(key);
            }
        }
    }

    /// Get an embedding from the cache without computing it.
    pub fn get(&self, key: &K) -> Option<Arc<Embedding>> {
        match self.slots().get(key) {
            Some(Slot::Ready(embedding)) => Some(Arc::clone(embedding)),
            _ => None,
        }
    }

    /// Check if an embedding is cached.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of cached embeddings.
    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }
}

impl<K, E> Default for EmbeddingCache<K, E>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> Arc<str> {
    payload
        .downcast_ref::<&str>()
        .map(|message| Arc::from(*message))
        .or_else(|| payload.downcast_ref::<String>().map(|m| Arc::from(m.as_str())))
        .unwrap_or_else(|| Arc::from("unknown panic"))
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached embeddings.
    pub entries: usize,

    /// Requests answered from a cached embedding.
    pub hits: u64,

    /// Requests that waited on another caller's computation.
    pub joined: u64,

    /// Computations started.
    pub computations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    type TestCache = EmbeddingCache<String, String>;

    #[tokio::test]
    async fn test_compute_then_hit() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let embedding = cache
                .get_or_compute("doc".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1.0, 2.0, 3.0])
                })
                .await
                .unwrap();
            assert_eq!(*embedding, vec![1.0, 2.0, 3.0]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 2,
                joined: 0,
                computations: 1,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_share_one_computation() {
        let cache = Arc::new(TestCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_compute("doc".to_string(), move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(vec![0.5, 0.25])
                        })
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 32);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failure_is_shared_and_not_cached() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            let calls = Arc::clone(&calls);
            cache.get_or_compute("doc".to_string(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Err::<Embedding, _>("model down".to_string())
            })
        });
        let results = futures::future::join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Err("model down".to_string())));
        assert!(!cache.contains(&"doc".to_string()));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_retried_on_next_call() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let attempt = |calls: Arc<AtomicUsize>| {
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient".to_string())
                } else {
                    Ok::<Embedding, String>(vec![4.0])
                }
            }
        };

        let first = cache
            .get_or_compute("doc".to_string(), attempt(Arc::clone(&calls)))
            .await;
        assert_eq!(first, Err("transient".to_string()));

        let second = cache
            .get_or_compute("doc".to_string(), attempt(Arc::clone(&calls)))
            .await
            .unwrap();
        assert_eq!(*second, vec![4.0]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get(&"doc".to_string()), Some(second));
    }

    async fn crashing_compute() -> Result<Embedding, String> {
        panic!("ocr backend crashed")
    }

    #[tokio::test]
    async fn test_panicked_computation_is_not_cached() {
        let cache = Arc::new(TestCache::new());

        let crashed = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("doc".to_string(), crashing_compute)
                    .await
            })
        }
        .await
        .unwrap_err();
        assert!(crashed.is_panic());
        assert!(cache.is_empty());

        let healthy = cache
            .get_or_compute("doc".to_string(), || async { Ok(vec![2.0]) })
            .await
            .unwrap();
        assert_eq!(*healthy, vec![2.0]);
        assert!(cache.contains(&"doc".to_string()));
        assert_eq!(cache.stats().computations, 2);
    }

    #[tokio::test]
    async fn test_panic_reaches_every_waiter() {
        let cache = Arc::new(TestCache::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("doc".to_string(), move || async move {
                        let _ = rx.await;
                        crashing_compute().await
                    })
                    .await
            })
        };
        while cache.stats().computations == 0 {
            tokio::task::yield_now().await;
        }
        let follower = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("doc".to_string(), || async { Ok(vec![9.0]) })
                    .await
            })
        };
        while cache.stats().joined == 0 {
            tokio::task::yield_now().await;
        }
        tx.send(()).unwrap();

        assert!(leader.await.unwrap_err().is_panic());
        assert!(follower.await.unwrap_err().is_panic());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block_each_other() {
        let cache = TestCache::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        // "a" cannot finish until "b" has finished.
        let a = cache.get_or_compute("a".to_string(), move || async move {
            rx.await.map(|()| vec![1.0]).map_err(|e| e.to_string())
        });
        let b = async {
            let result = cache
                .get_or_compute("b".to_string(), || async { Ok(vec![2.0]) })
                .await;
            let _ = tx.send(());
            result
        };

        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(a, b) })
            .await
            .unwrap();

        assert_eq!(*a.unwrap(), vec![1.0]);
        assert_eq!(*b.unwrap(), vec![2.0]);
        assert_eq!(cache.len(), 2);
    }
}
