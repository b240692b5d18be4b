#![no_main]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use lrudict::LruDict;

// Fuzz arbitrary operation sequences on LruDict
//
// Tests random sequences of set, get, delete, pop, popitem, setdefault,
// resize, clear, purge and toggle flips against the cache invariants, and
// checks that every queued eviction reaches the callback exactly once.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let capacity = usize::from(data[0] % 16) + 1;
    let cache: LruDict<u8, u32> = LruDict::with_callback(capacity, move |_, _| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    })
    .unwrap();

    let mut evictions = 0usize;
    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 12;
        let key = data[idx + 1] % 32;

        match op {
            0 | 1 => {
                // set
                let was_present = cache.contains(&key).unwrap();
                let was_full = cache.len() == cache.capacity();
                cache.set(key, u32::from(key)).unwrap();
                if !was_present && was_full {
                    evictions += 1;
                }
                assert_eq!(cache.peek_first().unwrap().0, key);
            }
            2 => {
                // get
                if let Ok(value) = cache.get(&key) {
                    assert_eq!(*value, u32::from(key));
                    assert_eq!(cache.peek_first().unwrap().0, key);
                }
            }
            3 => {
                // delete
                let was_present = cache.contains(&key).unwrap();
                assert_eq!(cache.delete(&key).is_ok(), was_present);
            }
            4 => {
                // pop
                let old_len = cache.len();
                if cache.pop(&key).is_ok() {
                    assert_eq!(cache.len(), old_len - 1);
                }
            }
            5 => {
                // popitem
                let _ = cache.popitem(key % 2 == 0);
            }
            6 => {
                // setdefault
                let was_present = cache.contains(&key).unwrap();
                let was_full = cache.len() == cache.capacity();
                let value = cache.setdefault(key, u32::from(key)).unwrap();
                assert_eq!(*value, u32::from(key));
                if !was_present && was_full {
                    evictions += 1;
                }
            }
            7 => {
                // resize
                let new_capacity = usize::from(key % 16) + 1;
                evictions += cache.len().saturating_sub(new_capacity);
                cache.resize(new_capacity).unwrap();
                assert!(cache.len() <= new_capacity);
            }
            8 => {
                // clear
                cache.clear().unwrap();
                assert!(cache.is_empty());
            }
            9 => {
                // toggle suspension
                cache.set_suspend_purge(!cache.suspend_purge());
            }
            10 => {
                // manual purge
                cache.purge().unwrap();
                assert_eq!(cache.purge_queue_len(), 0);
            }
            11 => {
                // snapshots agree with length
                assert_eq!(cache.keys().unwrap().len(), cache.len());
                let lru_first: Vec<(u8, Arc<u32>)> = cache.to_mapping().unwrap();
                let mut mru_first = cache.keys().unwrap();
                mru_first.reverse();
                let lru_keys: Vec<u8> = lru_first.into_iter().map(|(k, _)| k).collect();
                assert_eq!(lru_keys, mru_first);
            }
            _ => unreachable!(),
        }

        cache.check_invariants().unwrap();
        assert!(cache.len() <= cache.capacity());
        assert_eq!(
            delivered.load(Ordering::Relaxed) + cache.purge_queue_len(),
            evictions
        );

        idx += 2;
    }

    drop(cache);
    assert_eq!(delivered.load(Ordering::Relaxed), evictions);
});
