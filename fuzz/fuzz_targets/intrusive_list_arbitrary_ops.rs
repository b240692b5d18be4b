#![no_main]

use libfuzzer_sys::fuzz_target;
use lrudict::ds::IntrusiveList;

// Fuzz arbitrary operation sequences on IntrusiveList
//
// Tests random sequences of push_front, pop_front, pop_back, move_to_front,
// remove, get and take_all operations.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut list: IntrusiveList<u32> = IntrusiveList::new();
    let mut all_ids = Vec::new();

    let mut idx = 0;
    while idx + 1 < data.len() {
        let op = data[idx] % 7;
        let value = u32::from(data[idx + 1]);

        match op {
            0 => {
                // push_front
                let id = list.push_front(value);
                all_ids.push(id);

                assert_eq!(list.front(), Some(&value));
                assert_eq!(list.get(id), Some(&value));
            }
            1 => {
                // pop_front
                let old_len = list.len();
                if list.pop_front().is_some() {
                    assert_eq!(list.len(), old_len - 1);
                } else {
                    assert_eq!(list.len(), 0);
                }
            }
            2 => {
                // pop_back
                let old_len = list.len();
                if list.pop_back().is_some() {
                    assert_eq!(list.len(), old_len - 1);
                } else {
                    assert_eq!(list.len(), 0);
                }
            }
            3 => {
                // move_to_front
                if !all_ids.is_empty() {
                    let id = all_ids[(value as usize) % all_ids.len()];
                    if list.move_to_front(id) {
                        assert_eq!(list.front_id(), Some(id));
                    }
                }
            }
            4 => {
                // remove
                if !all_ids.is_empty() {
                    let id = all_ids[(value as usize) % all_ids.len()];
                    let old_len = list.len();
                    if list.remove(id).is_some() {
                        assert_eq!(list.len(), old_len - 1);
                        assert!(!list.contains(id));
                    }
                }
            }
            5 => {
                // iteration agrees in both directions
                let forward: Vec<u32> = list.iter().copied().collect();
                let mut backward: Vec<u32> = list.iter_rev().copied().collect();
                backward.reverse();
                assert_eq!(forward, backward);
                assert_eq!(forward.len(), list.len());
            }
            6 => {
                // take_all
                let expected: Vec<u32> = list.iter().copied().collect();
                assert_eq!(list.take_all(), expected);
                all_ids.clear();
                assert!(list.is_empty());
            }
            _ => unreachable!(),
        }

        list.check_invariants().unwrap();
        idx += 2;
    }
});
