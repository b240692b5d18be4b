// ==============================================
// LRU DICT PROPERTY TESTS (integration)
// ==============================================
//
// Random operation sequences checked against a plain Vec model kept in
// most- to least-recently-used order.

use std::sync::{Arc, Mutex};

use lrudict::error::LruError;
use lrudict::policy::lru_dict::LruDict;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Set(u32, i32),
    Get(u32),
    Delete(u32),
    Pop(u32),
    PopItem(bool),
    SetDefault(u32, i32),
    Update(Vec<(u32, i32)>),
    Resize(usize),
    Clear,
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (0u32..40, any::<i32>()).prop_map(|(k, v)| Operation::Set(k, v)),
        3 => (0u32..40).prop_map(Operation::Get),
        1 => (0u32..40).prop_map(Operation::Delete),
        1 => (0u32..40).prop_map(Operation::Pop),
        1 => any::<bool>().prop_map(Operation::PopItem),
        1 => (0u32..40, any::<i32>()).prop_map(|(k, v)| Operation::SetDefault(k, v)),
        1 => prop::collection::vec((0u32..40, any::<i32>()), 0..20).prop_map(Operation::Update),
        1 => (1usize..20).prop_map(Operation::Resize),
        1 => Just(Operation::Clear),
    ]
}

/// Reference model: `entries[0]` is the most recently used pair.
struct Model {
    entries: Vec<(u32, i32)>,
    capacity: usize,
    evicted: Vec<(u32, i32)>,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            evicted: Vec::new(),
        }
    }

    fn position(&self, key: u32) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    fn touch(&mut self, key: u32) -> Option<i32> {
        let index = self.position(key)?;
        let entry = self.entries.remove(index);
        self.entries.insert(0, entry);
        Some(entry.1)
    }

    fn set(&mut self, key: u32, value: i32) {
        if let Some(index) = self.position(key) {
            self.entries.remove(index);
        } else if self.entries.len() == self.capacity {
            if let Some(tail) = self.entries.pop() {
                self.evicted.push(tail);
            }
        }
        self.entries.insert(0, (key, value));
    }

    fn remove(&mut self, key: u32) -> Option<i32> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            if let Some(tail) = self.entries.pop() {
                self.evicted.push(tail);
            }
        }
    }

    fn keys(&self) -> Vec<u32> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }
}

fn logged_cache(capacity: usize) -> (LruDict<u32, i32>, Arc<Mutex<Vec<(u32, i32)>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let cache = LruDict::with_callback(capacity, move |key, value: Arc<i32>| {
        sink.lock().unwrap().push((key, *value));
        Ok(())
    })
    .unwrap();
    (cache, log)
}

fn apply(cache: &LruDict<u32, i32>, model: &mut Model, op: Operation) -> Result<(), TestCaseError> {
    match op {
        Operation::Set(k, v) => {
            cache.set(k, v).unwrap();
            model.set(k, v);
        },
        Operation::Get(k) => {
            let got = cache.get(&k).ok().map(|v| *v);
            prop_assert_eq!(got, model.touch(k));
        },
        Operation::Delete(k) => {
            let deleted = cache.delete(&k).is_ok();
            prop_assert_eq!(deleted, model.remove(k).is_some());
        },
        Operation::Pop(k) => {
            let popped = cache.pop(&k).ok().map(|v| *v);
            prop_assert_eq!(popped, model.remove(k));
        },
        Operation::PopItem(least_recent) => {
            let popped = cache.popitem(least_recent).ok().map(|(k, v)| (k, *v));
            let expected = if model.entries.is_empty() {
                None
            } else if least_recent {
                model.entries.pop()
            } else {
                Some(model.entries.remove(0))
            };
            prop_assert_eq!(popped, expected);
        },
        Operation::SetDefault(k, v) => {
            let got = *cache.setdefault(k, v).unwrap();
            let expected = match model.touch(k) {
                Some(existing) => existing,
                None => {
                    model.set(k, v);
                    v
                },
            };
            prop_assert_eq!(got, expected);
        },
        Operation::Update(pairs) => {
            cache.update(pairs.clone()).unwrap();
            for (k, v) in pairs {
                model.set(k, v);
            }
        },
        Operation::Resize(capacity) => {
            cache.resize(capacity).unwrap();
            model.resize(capacity);
        },
        Operation::Clear => {
            cache.clear().unwrap();
            model.entries.clear();
        },
    }
    Ok(())
}

proptest! {
    /// len() never exceeds capacity and internal structures agree.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_len_within_capacity(
        capacity in 1usize..20,
        ops in prop::collection::vec(operation_strategy(), 0..150)
    ) {
        let cache: LruDict<u32, i32> = LruDict::new(capacity).unwrap();
        let mut model = Model::new(capacity);
        for op in ops {
            apply(&cache, &mut model, op)?;
            prop_assert!(cache.len() <= cache.capacity());
            prop_assert!(cache.check_invariants().is_ok());
        }
    }

    /// Recency order matches the Vec model after every operation.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_matches_vec_model(
        capacity in 1usize..20,
        ops in prop::collection::vec(operation_strategy(), 0..150)
    ) {
        let cache: LruDict<u32, i32> = LruDict::new(capacity).unwrap();
        let mut model = Model::new(capacity);
        for op in ops {
            apply(&cache, &mut model, op)?;
            prop_assert_eq!(cache.keys().unwrap(), model.keys());
            prop_assert_eq!(cache.len(), model.entries.len());
            prop_assert_eq!(cache.capacity(), model.capacity);
        }
    }

    /// Every eviction reaches the callback once, in eviction order.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_callback_order_is_fifo(
        capacity in 1usize..12,
        ops in prop::collection::vec(operation_strategy(), 0..150)
    ) {
        let (cache, log) = logged_cache(capacity);
        let mut model = Model::new(capacity);
        for op in ops {
            apply(&cache, &mut model, op)?;
            prop_assert_eq!(cache.purge_queue_len(), 0);
            prop_assert_eq!(&*log.lock().unwrap(), &model.evicted);
        }
    }

    /// Suspended purging defers delivery without reordering it.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_suspended_purge_preserves_order(
        capacity in 1usize..8,
        keys in prop::collection::vec(0u32..30, 0..100)
    ) {
        let (cache, log) = logged_cache(capacity);
        cache.set_suspend_purge(true);
        let mut model = Model::new(capacity);
        for key in keys {
            cache.set(key, key as i32).unwrap();
            model.set(key, key as i32);
        }
        prop_assert!(log.lock().unwrap().is_empty());
        prop_assert_eq!(cache.purge_queue_len(), model.evicted.len());

        let purged = cache.purge().unwrap();
        prop_assert_eq!(purged, model.evicted.len());
        prop_assert_eq!(&*log.lock().unwrap(), &model.evicted);
    }

    /// Hits and misses count exactly the successful and failed lookups.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_stats_count_lookups(
        capacity in 1usize..10,
        ops in prop::collection::vec((0u32..20, any::<bool>()), 0..100)
    ) {
        let cache: LruDict<u32, i32> = LruDict::new(capacity).unwrap();
        let (mut hits, mut misses) = (0u64, 0u64);
        for (key, write) in ops {
            if write {
                cache.set(key, 0).unwrap();
            } else {
                match cache.get(&key) {
                    Ok(_) => hits += 1,
                    Err(LruError::KeyNotFound) => misses += 1,
                    Err(err) => return Err(TestCaseError::fail(err.to_string())),
                }
            }
        }
        let stats = cache.stats();
        prop_assert_eq!((stats.hits, stats.misses), (hits, misses));
    }
}
