//! # LRU core: lookup index + recency list
//!
//! Single-threaded, `&mut self` engine that [`LruDict`](super::lru_dict::LruDict)
//! runs inside its critical section. The core never drops a user key or value
//! itself: anything that leaves the cache (an evicted entry, a replaced value,
//! a duplicate key) is handed back to the caller, which decides when it is safe
//! to release.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         LruCore<K, V>                                │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  HashTable<SlotId>  (hashbrown, keyed by cached hash)        │   │
//!   │   │                                                              │   │
//!   │   │   hash(k1) ─► id_0 ─────────────┐                            │   │
//!   │   │   hash(k2) ─► id_1 ───────┐     │                            │   │
//!   │   │   hash(k3) ─► id_2 ─┐     │     │                            │   │
//!   │   └─────────────────────┼─────┼─────┼────────────────────────────┘   │
//!   │                         ▼     ▼     ▼                                │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  IntrusiveList<Entry<K, V>>  (SlotArena-backed)              │   │
//!   │   │                                                              │   │
//!   │   │  head ──► [k3] ◄──► [k2] ◄──► [k1] ◄── tail                  │   │
//!   │   │   (MRU)                          (LRU)                       │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Structure
//!
//! ```text
//!   ┌─────────────────────────────────────────────┐
//!   │               Entry<K, V>                   │
//!   ├─────────────────────────┬───────────────────┤
//!   │  key: K                 │  owned            │
//!   │  value: Arc<V>          │  shared on reads  │
//!   │  hash: u64              │  computed once    │
//!   └─────────────────────────┴───────────────────┘
//! ```
//!
//! The hash is computed by the caller before it enters the critical section
//! and cached in the entry. Growing the index and removing an entry by slot
//! both use the cached hash, so the only user code the core ever runs is the
//! key's `Eq` during a lookup.
//!
//! ## Operations
//!
//! | Method            | Complexity | Description                                  |
//! |-------------------|------------|----------------------------------------------|
//! | `get`             | O(1)       | Lookup, promotes to MRU                      |
//! | `upsert`          | O(1)       | Replace in place or insert + evict LRU       |
//! | `remove`          | O(1)       | Remove by key                                |
//! | `pop_lru/pop_mru` | O(1)       | Remove from either end                       |
//! | `set_capacity`    | O(k)       | Shrink evicts `k` entries, LRU first         |
//! | `take_all`        | O(n)       | Empty the cache, entries returned MRU first  |

use std::fmt;
use std::sync::Arc;

use hashbrown::HashTable;

use crate::ds::intrusive_list::{IntrusiveList, Iter};
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;

/// One cached key/value pair with its precomputed hash.
#[derive(Debug)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: Arc<V>,
    pub hash: u64,
}

impl<K, V> Entry<K, V> {
    pub fn into_pair(self) -> (K, Arc<V>) {
        (self.key, self.value)
    }
}

/// Outcome of [`LruCore::upsert`].
#[derive(Debug)]
pub enum Upsert<K, V> {
    /// The key was new. Holds the entry pushed out to make room, if any.
    Inserted { evicted: Option<Entry<K, V>> },
    /// The key existed; its value was swapped and the entry promoted.
    /// `spare_key` is the caller's duplicate of the stored key.
    Replaced { old_value: Arc<V>, spare_key: K },
}

pub struct LruCore<K, V> {
    index: HashTable<SlotId>,
    list: IntrusiveList<Entry<K, V>>,
    capacity: usize,
}

impl<K, V> LruCore<K, V>
where
    K: Eq,
{
    /// Creates an empty core. `capacity` must be at least one.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            index: HashTable::with_capacity(capacity.min(1024)),
            list: IntrusiveList::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn find(&self, hash: u64, key: &K) -> Option<SlotId> {
        let list = &self.list;
        self.index
            .find(hash, |id| list.get(*id).is_some_and(|entry| entry.key == *key))
            .copied()
    }

    pub fn contains(&self, hash: u64, key: &K) -> bool {
        self.find(hash, key).is_some()
    }

    /// Returns a handle to the value and promotes the entry to MRU.
    pub fn get(&mut self, hash: u64, key: &K) -> Option<Arc<V>> {
        let id = self.find(hash, key)?;
        self.list.move_to_front(id);
        self.list.get(id).map(|entry| Arc::clone(&entry.value))
    }

    /// Inserts or replaces `key`.
    ///
    /// A new key evicts the LRU entry first when the core is full, so the
    /// entry just written is never the one evicted.
    pub fn upsert(&mut self, hash: u64, key: K, value: Arc<V>) -> Upsert<K, V> {
        if let Some(id) = self.find(hash, &key) {
            self.list.move_to_front(id);
            if let Some(entry) = self.list.get_mut(id) {
                let old_value = std::mem::replace(&mut entry.value, value);
                return Upsert::Replaced {
                    old_value,
                    spare_key: key,
                };
            }
        }

        let evicted = if self.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let id = self.list.push_front(Entry { key, value, hash });
        let list = &self.list;
        self.index.insert_unique(hash, id, |id| {
            list.get(*id).map_or(0, |entry| entry.hash)
        });
        Upsert::Inserted { evicted }
    }

    /// Removes `key` and returns its entry.
    pub fn remove(&mut self, hash: u64, key: &K) -> Option<Entry<K, V>> {
        let list = &self.list;
        let found = self
            .index
            .find_entry(hash, |id| list.get(*id).is_some_and(|entry| entry.key == *key))
            .ok()?;
        let (id, _) = found.remove();
        self.list.remove(id)
    }

    /// Removes an entry by slot. Matches on the slot id alone, so no key
    /// comparison runs.
    fn remove_slot(&mut self, id: SlotId) -> Option<Entry<K, V>> {
        let hash = self.list.get(id)?.hash;
        if let Ok(found) = self.index.find_entry(hash, |candidate| *candidate == id) {
            found.remove();
        }
        self.list.remove(id)
    }

    pub fn pop_lru(&mut self) -> Option<Entry<K, V>> {
        let id = self.list.back_id()?;
        self.remove_slot(id)
    }

    pub fn pop_mru(&mut self) -> Option<Entry<K, V>> {
        let id = self.list.front_id()?;
        self.remove_slot(id)
    }

    pub fn peek_lru(&self) -> Option<&Entry<K, V>> {
        self.list.back()
    }

    pub fn peek_mru(&self) -> Option<&Entry<K, V>> {
        self.list.front()
    }

    /// Changes the capacity and returns the entries that no longer fit,
    /// least recently used first.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Entry<K, V>> {
        debug_assert!(capacity > 0);
        self.capacity = capacity;
        let excess = self.len().saturating_sub(capacity);
        let mut evicted = Vec::with_capacity(excess);
        for _ in 0..excess {
            match self.pop_lru() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        evicted
    }

    /// Empties the core and returns every entry, MRU first.
    pub fn take_all(&mut self) -> Vec<Entry<K, V>> {
        self.index.clear();
        self.list.take_all()
    }

    /// Iterates entries from MRU to LRU.
    pub fn iter(&self) -> Iter<'_, Entry<K, V>> {
        self.list.iter()
    }

    /// Iterates entries from LRU to MRU.
    pub fn iter_lru(&self) -> std::iter::Rev<Iter<'_, Entry<K, V>>> {
        self.list.iter_rev()
    }

    /// Checks that index, list and capacity agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} slots but list holds {} entries",
                self.index.len(),
                self.list.len()
            )));
        }
        if self.list.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "length {} exceeds capacity {}",
                self.list.len(),
                self.capacity
            )));
        }
        for id in self.index.iter() {
            let Some(entry) = self.list.get(*id) else {
                return Err(InvariantError::new(format!(
                    "index refers to vacant slot {}",
                    id.index()
                )));
            };
            if self.index.find(entry.hash, |candidate| candidate == id).is_none() {
                return Err(InvariantError::new(format!(
                    "slot {} not reachable through its cached hash",
                    id.index()
                )));
            }
        }
        Ok(())
    }
}

impl<K, V> fmt::Debug for LruCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.list.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    use rustc_hash::FxBuildHasher;

    fn h<K: std::hash::Hash>(key: &K) -> u64 {
        FxBuildHasher.hash_one(key)
    }

    fn put(core: &mut LruCore<u32, &'static str>, key: u32, value: &'static str) -> Upsert<u32, &'static str> {
        core.upsert(h(&key), key, Arc::new(value))
    }

    fn keys_mru(core: &LruCore<u32, &'static str>) -> Vec<u32> {
        core.iter().map(|entry| entry.key).collect()
    }

    #[test]
    fn lru_core_insert_get_promotes() {
        let mut core = LruCore::new(3);
        put(&mut core, 1, "a");
        put(&mut core, 2, "b");
        put(&mut core, 3, "c");
        assert_eq!(keys_mru(&core), vec![3, 2, 1]);

        assert_eq!(core.get(h(&1), &1).as_deref(), Some(&"a"));
        assert_eq!(keys_mru(&core), vec![1, 3, 2]);
        core.check_invariants().unwrap();
    }

    #[test]
    fn lru_core_full_insert_evicts_tail() {
        let mut core = LruCore::new(2);
        put(&mut core, 1, "a");
        put(&mut core, 2, "b");
        match put(&mut core, 3, "c") {
            Upsert::Inserted { evicted: Some(entry) } => {
                assert_eq!(entry.key, 1);
                assert_eq!(*entry.value, "a");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(keys_mru(&core), vec![3, 2]);
        core.check_invariants().unwrap();
    }

    #[test]
    fn lru_core_replace_returns_old_value_and_spare_key() {
        let mut core = LruCore::new(2);
        put(&mut core, 1, "a");
        put(&mut core, 2, "b");
        match put(&mut core, 1, "z") {
            Upsert::Replaced {
                old_value,
                spare_key,
            } => {
                assert_eq!(*old_value, "a");
                assert_eq!(spare_key, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(keys_mru(&core), vec![1, 2]);
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn lru_core_remove_and_pops() {
        let mut core = LruCore::new(4);
        for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            put(&mut core, k, v);
        }
        assert_eq!(core.remove(h(&2), &2).map(|e| e.key), Some(2));
        assert!(core.remove(h(&2), &2).is_none());
        assert_eq!(core.pop_lru().map(|e| e.key), Some(1));
        assert_eq!(core.pop_mru().map(|e| e.key), Some(4));
        assert_eq!(core.peek_lru().map(|e| e.key), Some(3));
        assert_eq!(core.peek_mru().map(|e| e.key), Some(3));
        core.check_invariants().unwrap();
    }

    #[test]
    fn lru_core_shrink_returns_lru_first() {
        let mut core = LruCore::new(5);
        for k in 1..=5 {
            put(&mut core, k, "v");
        }
        let evicted: Vec<u32> = core.set_capacity(2).into_iter().map(|e| e.key).collect();
        assert_eq!(evicted, vec![1, 2, 3]);
        assert_eq!(keys_mru(&core), vec![5, 4]);
        assert_eq!(core.capacity(), 2);

        assert!(core.set_capacity(10).is_empty());
        assert_eq!(core.len(), 2);
        core.check_invariants().unwrap();
    }

    #[test]
    fn lru_core_take_all_empties() {
        let mut core = LruCore::new(3);
        put(&mut core, 1, "a");
        put(&mut core, 2, "b");
        let taken: Vec<u32> = core.take_all().into_iter().map(|e| e.key).collect();
        assert_eq!(taken, vec![2, 1]);
        assert!(core.is_empty());
        assert!(!core.contains(h(&1), &1));
        core.check_invariants().unwrap();
        put(&mut core, 7, "g");
        assert_eq!(keys_mru(&core), vec![7]);
    }

    #[test]
    fn lru_core_iter_lru_is_reverse() {
        let mut core = LruCore::new(3);
        for k in [1, 2, 3] {
            put(&mut core, k, "v");
        }
        let lru: Vec<u32> = core.iter_lru().map(|e| e.key).collect();
        assert_eq!(lru, vec![1, 2, 3]);
    }

    #[test]
    fn lru_core_survives_colliding_hashes() {
        // Every key shares one hash; equality alone tells them apart.
        let mut core: LruCore<u32, &'static str> = LruCore::new(3);
        for k in 0..3 {
            core.upsert(42, k, Arc::new("v"));
        }
        assert!(core.contains(42, &1));
        assert_eq!(core.remove(42, &1).map(|e| e.key), Some(1));
        core.upsert(42, 9, Arc::new("w"));
        assert_eq!(core.len(), 3);
        core.check_invariants().unwrap();
    }
}
