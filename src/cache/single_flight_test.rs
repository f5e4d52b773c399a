use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::SingleFlightCache;
use crate::StorageError;

const TTL: Duration = Duration::from_secs(60 * 60);

#[tokio::test]
async fn concurrent_misses_should_collapse_into_one_load() {
    let cache: Arc<SingleFlightCache<String, u64>> = Arc::new(SingleFlightCache::new(TTL));
    let loads = Arc::new(AtomicUsize::new(0));

    let callers = (0..32).map(|_| {
        let cache = cache.clone();
        let loads = loads.clone();
        async move {
            cache
                .get_or_load(&"k".to_string(), || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(42)
                })
                .await
        }
    });
    let results = join_all(callers).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| *r == Ok(42)));
}

#[tokio::test]
async fn different_keys_should_load_independently() {
    let cache: SingleFlightCache<&'static str, &'static str> = SingleFlightCache::new(TTL);

    // A load that never finishes on one key must not block another key
    let slow = cache.get_or_load(&"slow", || futures::future::pending());
    let fast = cache.get_or_load(&"fast", || async { Ok("done") });

    let result = tokio::select! {
        _ = slow => unreachable!("pending load resolved"),
        r = fast => r,
    };
    assert_eq!(result, Ok("done"));
}

#[tokio::test]
async fn cached_value_should_be_reused() {
    let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(TTL);
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_load(&1, || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(value, Ok(7));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.peek(&1), Some(7));
}

#[tokio::test]
async fn failed_load_should_reach_all_waiters_and_not_be_cached() {
    let cache: Arc<SingleFlightCache<u32, u32>> = Arc::new(SingleFlightCache::new(TTL));
    let loads = Arc::new(AtomicUsize::new(0));

    let callers = (0..8).map(|_| {
        let cache = cache.clone();
        let loads = loads.clone();
        async move {
            cache
                .get_or_load(&1, || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(StorageError::Unavailable("db down".into()))
                })
                .await
        }
    });
    let results = join_all(callers).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| matches!(r, Err(StorageError::Unavailable(_)))));
    assert!(cache.is_empty());

    // next access retries
    let value = cache.get_or_load(&1, || async { Ok(3) }).await;
    assert_eq!(value, Ok(3));
}

#[tokio::test]
async fn invalidate_should_force_reload() {
    let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(TTL);
    cache.get_or_load(&1, || async { Ok(1) }).await.unwrap();

    assert!(cache.invalidate(&1));
    assert!(!cache.invalidate(&1));

    let value = cache.get_or_load(&1, || async { Ok(2) }).await;
    assert_eq!(value, Ok(2));
}

#[tokio::test]
async fn invalidate_if_should_only_drop_matching_loaded_values() {
    let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(TTL);
    cache.get_or_load(&1, || async { Ok(10) }).await.unwrap();

    assert!(!cache.invalidate_if(&1, |v| *v < 5));
    assert_eq!(cache.peek(&1), Some(10));
    assert!(cache.invalidate_if(&1, |v| *v < 20));
    assert_eq!(cache.peek(&1), None);
    assert!(!cache.invalidate_if(&2, |_| true));
}

#[tokio::test(start_paused = true)]
async fn idle_entry_should_be_reloaded_after_expiry() {
    let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(Duration::from_secs(60));
    cache.get_or_load(&1, || async { Ok(1) }).await.unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    // access refreshes the idle timer
    assert_eq!(cache.get_or_load(&1, || async { Ok(99) }).await, Ok(1));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(cache.get_or_load(&1, || async { Ok(99) }).await, Ok(1));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.get_or_load(&1, || async { Ok(2) }).await, Ok(2));
}

#[tokio::test(start_paused = true)]
async fn evict_idle_should_remove_only_expired_entries() {
    let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(Duration::from_secs(60));
    cache.get_or_load(&1, || async { Ok(1) }).await.unwrap();

    tokio::time::advance(Duration::from_secs(40)).await;
    cache.get_or_load(&2, || async { Ok(2) }).await.unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(cache.evict_idle(), 1);
    assert_eq!(cache.peek(&1), None);
    assert_eq!(cache.peek(&2), Some(2));
    assert_eq!(cache.len(), 1);
}
