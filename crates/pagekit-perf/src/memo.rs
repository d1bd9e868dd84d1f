//! Memoization
//!
//! Results are cached under the JSON serialization of the argument, so two
//! arguments that serialize identically share an entry. Arguments that fail
//! to serialize are passed through uncached.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use serde::Serialize;

use crate::timing::lock;

struct MemoCache<R> {
    entries: HashMap<String, R>,
    /// Least recently used first; only maintained when bounded
    recency: VecDeque<String>,
    capacity: Option<NonZeroUsize>,
}

impl<R: Clone> MemoCache<R> {
    fn get(&mut self, key: &str) -> Option<R> {
        let value = self.entries.get(key)?.clone();
        if self.capacity.is_some() {
            self.touch(key);
        }
        Some(value)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn insert(&mut self, key: String, value: R) {
        let Some(capacity) = self.capacity else {
            self.entries.insert(key, value);
            return;
        };

        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.recency.push_back(key);
        while self.entries.len() > capacity.get() {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Memoized function handle
pub struct Memoized<A, R> {
    func: Box<dyn Fn(A) -> R + Send + Sync>,
    cache: Mutex<MemoCache<R>>,
}

/// Cache every result of `func` for the lifetime of the handle
pub fn memoize<A, R, F>(func: F) -> Memoized<A, R>
where
    A: Serialize,
    R: Clone,
    F: Fn(A) -> R + Send + Sync + 'static,
{
    Memoized::with_capacity(func, None)
}

/// Like [`memoize`], evicting the least recently used entry beyond `capacity`
pub fn memoize_bounded<A, R, F>(func: F, capacity: NonZeroUsize) -> Memoized<A, R>
where
    A: Serialize,
    R: Clone,
    F: Fn(A) -> R + Send + Sync + 'static,
{
    Memoized::with_capacity(func, Some(capacity))
}

impl<A: Serialize, R: Clone> Memoized<A, R> {
    fn with_capacity<F>(func: F, capacity: Option<NonZeroUsize>) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            cache: Mutex::new(MemoCache {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                capacity,
            }),
        }
    }

    pub fn call(&self, args: A) -> R {
        let key = match serde_json::to_string(&args) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(error = %e, "memoize key not serializable, calling through");
                return (self.func)(args);
            }
        };

        if let Some(hit) = lock(&self.cache).get(&key) {
            return hit;
        }

        // Computed outside the lock so the function may re-enter the cache
        let value = (self.func)(args);
        lock(&self.cache).insert(key, value.clone());
        value
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.cache).entries.len()
    }

    pub fn clear(&self) {
        let mut cache = lock(&self.cache);
        cache.entries.clear();
        cache.recency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let square = memoize(move |n: u64| {
            c.fetch_add(1, Ordering::SeqCst);
            n * n
        });

        assert_eq!(square.call(12), 144);
        assert_eq!(square.call(12), 144);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(square.call(3), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_structural_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let join = memoize(move |(a, b): (String, Vec<u8>)| {
            c.fetch_add(1, Ordering::SeqCst);
            format!("{a}:{}", b.len())
        });

        join.call(("x".to_string(), vec![1, 2]));
        join.call(("x".to_string(), vec![1, 2]));
        join.call(("x".to_string(), vec![1, 2, 3]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(join.cache_len(), 2);
    }

    #[test]
    fn test_unserializable_args_bypass_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let count_keys = memoize(move |m: HashMap<(u8, u8), u8>| {
            c.fetch_add(1, Ordering::SeqCst);
            m.len()
        });

        let mut map = HashMap::new();
        map.insert((1, 2), 3);
        assert_eq!(count_keys.call(map.clone()), 1);
        assert_eq!(count_keys.call(map), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(count_keys.cache_len(), 0);
    }

    #[test]
    fn test_bounded_evicts_least_recent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let double = memoize_bounded(
            move |n: u32| {
                c.fetch_add(1, Ordering::SeqCst);
                n * 2
            },
            NonZeroUsize::new(2).unwrap(),
        );

        double.call(1);
        double.call(2);
        double.call(1); // 1 is now most recent
        double.call(3); // evicts 2
        assert_eq!(double.cache_len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        double.call(1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        double.call(2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_clear() {
        let m = memoize(|n: i32| n + 1);
        m.call(1);
        m.clear();
        assert_eq!(m.cache_len(), 0);
    }
}
