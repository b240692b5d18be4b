//! Static perfect-hash set over [`TypeId`]s.
//!
//! Built once from a fixed list of type identities, then answers membership
//! with a single probe: no chains, no secondary lookups.
//!
//! ## Construction
//!
//! ```text
//!   fingerprint = FxHash(type_id)
//!   slot        = (fingerprint.rotate_left(r) * GOLDEN) >> (64 - bits)
//!
//!   for bits in log2(next_pow2(n)) ..= log2(MAX_SLOTS):
//!       for r in 0..64:
//!           if every member lands in its own slot -> done
//!   otherwise -> None (set unavailable)
//! ```
//!
//! A lookup recomputes the slot for the probe and compares the stored
//! `TypeId` for equality, so a type that was never inserted cannot produce a
//! false positive even when its slot is occupied.

use std::any::TypeId;
use std::hash::BuildHasher;

use rustc_hash::FxBuildHasher;

/// Upper bound on the table size searched during construction.
pub const MAX_SLOTS: usize = 256;

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone)]
pub struct TypeSet {
    table: Box<[Option<TypeId>]>,
    rotation: u32,
    shift: u32,
    len: usize,
}

impl TypeSet {
    /// Builds a collision-free table for `types`, or returns `None` if no
    /// rotation fits within [`MAX_SLOTS`] slots.
    pub fn build(types: &[TypeId]) -> Option<Self> {
        Self::build_within(types, MAX_SLOTS)
    }

    pub(crate) fn build_within(types: &[TypeId], max_slots: usize) -> Option<Self> {
        let mut members: Vec<TypeId> = Vec::with_capacity(types.len());
        for id in types {
            if !members.contains(id) {
                members.push(*id);
            }
        }

        let fingerprints: Vec<u64> = members.iter().map(fingerprint).collect();
        let mut size = members.len().max(2).next_power_of_two();
        while size <= max_slots {
            let bits = size.trailing_zeros();
            let shift = 64 - bits;
            for rotation in 0..64 {
                if let Some(table) = place(&members, &fingerprints, size, rotation, shift) {
                    return Some(Self {
                        table,
                        rotation,
                        shift,
                        len: members.len(),
                    });
                }
            }
            size *= 2;
        }
        None
    }

    pub fn contains(&self, id: TypeId) -> bool {
        let idx = slot(fingerprint(&id), self.rotation, self.shift);
        self.table[idx] == Some(id)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of table slots, occupied or not.
    pub fn slots(&self) -> usize {
        self.table.len()
    }
}

fn fingerprint(id: &TypeId) -> u64 {
    FxBuildHasher.hash_one(id)
}

#[inline]
fn slot(fingerprint: u64, rotation: u32, shift: u32) -> usize {
    (fingerprint.rotate_left(rotation).wrapping_mul(GOLDEN) >> shift) as usize
}

fn place(
    members: &[TypeId],
    fingerprints: &[u64],
    size: usize,
    rotation: u32,
    shift: u32,
) -> Option<Box<[Option<TypeId>]>> {
    let mut table = vec![None; size];
    for (id, fp) in members.iter().zip(fingerprints) {
        let idx = slot(*fp, rotation, shift);
        if table[idx].is_some() {
            return None;
        }
        table[idx] = Some(*id);
    }
    Some(table.into_boxed_slice())
}
