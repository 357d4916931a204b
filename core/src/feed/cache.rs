use crate::prelude::FeedResult;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How often a feed is refetched and how long a result is served without refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub refetch_interval: Duration,
    pub stale_after: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            refetch_interval: Duration::from_secs(5 * 60),
            stale_after: Duration::from_secs(2 * 60),
        }
    }
}

struct Cached<T> {
    value: T,
    fetched_at: Instant,
    invalidated: bool,
}

impl<T> Cached<T> {
    fn is_fresh(&self, stale_after: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_after
    }
}

/// Single-slot cache for one remote resource.
///
/// The slot lock is held for the whole fetch, so callers arriving while a
/// request is in flight wait for it and then read its result.
pub struct QueryCache<T> {
    policy: RefreshPolicy,
    slot: Mutex<Option<Cached<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            slot: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Returns the cached value while it is fresh, otherwise runs `fetch`.
    ///
    /// A failed fetch leaves the previous value untouched.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> FeedResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FeedResult<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref().filter(|c| c.is_fresh(self.policy.stale_after)) {
            return Ok(cached.value.clone());
        }

        let value = fetch().await?;
        *slot = Some(Cached {
            value: value.clone(),
            fetched_at: Instant::now(),
            invalidated: false,
        });
        Ok(value)
    }

    /// Last successful value and its age, without fetching.
    pub async fn peek(&self) -> Option<(T, Duration)> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|cached| (cached.value.clone(), cached.fetched_at.elapsed()))
    }

    /// Marks the cached value stale so the next call refetches.
    pub async fn invalidate(&self) {
        if let Some(cached) = self.slot.lock().await.as_mut() {
            cached.invalidated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::FeedError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn fresh_value_is_served_without_refetch() {
        let cache = QueryCache::new(RefreshPolicy::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let cache = Arc::new(QueryCache::new(RefreshPolicy::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let request = |cache: Arc<QueryCache<u32>>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(7)
                })
                .await
        };

        let (a, b) = tokio::join!(
            request(cache.clone(), calls.clone()),
            request(cache.clone(), calls.clone())
        );
        assert_eq!((a.unwrap(), b.unwrap()), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_keeps_previous_value() {
        let policy = RefreshPolicy {
            stale_after: Duration::ZERO,
            ..Default::default()
        };
        let cache = QueryCache::new(policy);
        cache.get_or_fetch(|| async { Ok(1) }).await.unwrap();

        let err = cache
            .get_or_fetch(|| async { Err(FeedError::Transport("down".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, FeedError::Transport("down".into()));
        assert_eq!(cache.peek().await.map(|(value, _)| value), Some(1));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = QueryCache::new(RefreshPolicy::default());
        cache.get_or_fetch(|| async { Ok("old") }).await.unwrap();
        cache.invalidate().await;
        let value = cache.get_or_fetch(|| async { Ok("new") }).await.unwrap();
        assert_eq!(value, "new");
    }
}
