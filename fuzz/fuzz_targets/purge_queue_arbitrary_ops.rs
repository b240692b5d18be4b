#![no_main]

use libfuzzer_sys::fuzz_target;
use lrudict::ds::{DrainLimit, PurgeQueue};

// Fuzz arbitrary push/drain interleavings on PurgeQueue
//
// Items carry a sequence number; every drained item must be the next one in
// sequence, whatever the mix of bounded and unbounded passes and pushes made
// while a pass is open.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut queue: PurgeQueue<u64> = PurgeQueue::with_max_pending(usize::from(data[0]) + 1);
    let mut pushed = 0u64;
    let mut expected = 0u64;

    for &byte in &data[1..] {
        match byte % 4 {
            0 | 1 => {
                queue.push(pushed);
                pushed += 1;
            }
            2 | 3 => {
                let limit = if byte % 4 == 2 {
                    DrainLimit::Bounded
                } else {
                    DrainLimit::Unbounded
                };
                let Some(ticket) = queue.begin_drain(limit) else {
                    assert_eq!(queue.pending(), 0);
                    continue;
                };
                assert!(queue.begin_drain(DrainLimit::Unbounded).is_none());
                let mut taken = 0usize;
                while let Some(item) = queue.next_in(&ticket) {
                    assert_eq!(item, expected);
                    expected += 1;
                    taken += 1;
                    // Pushes during a pass wait for the next one.
                    if byte & 0x80 != 0 {
                        queue.push(pushed);
                        pushed += 1;
                    }
                }
                if limit == DrainLimit::Bounded {
                    assert!(taken <= queue.max_pending());
                }
                queue.finish_drain(ticket);
                assert!(!queue.is_draining());
            }
            _ => unreachable!(),
        }
        assert_eq!(queue.pending() as u64, pushed - expected);
        assert_eq!(queue.storage_len(), queue.pending());
    }
});
