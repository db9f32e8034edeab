//! Per-key single-flight locks.
//!
//! Recomputations for different subjects run concurrently; recomputations
//! for the same subject are serialized so at most one is in flight and the
//! rest find its result in the cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys with a lock entry.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Forget locks nobody holds or waits on.
    pub async fn cleanup(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&"1.2.285".to_string()).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_keys_run_in_parallel() {
        let locks = Arc::new(KeyedLocks::new());
        let start = Instant::now();

        let mut handles = Vec::new();
        for i in 0..4 {
            let locks = Arc::clone(&locks);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&format!("1.2.{i}")).await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_millis(180),
            "Expected parallel execution, took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn cleanup_removes_idle_locks() {
        let locks = KeyedLocks::new();
        drop(locks.lock(&"a").await);
        let held = locks.lock(&"b").await;
        assert_eq!(locks.tracked().await, 2);

        locks.cleanup().await;
        assert_eq!(locks.tracked().await, 1);
        drop(held);
        locks.cleanup().await;
        assert_eq!(locks.tracked().await, 0);
    }
}
