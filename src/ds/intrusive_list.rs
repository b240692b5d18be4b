//! Doubly linked recency list over a [`SlotArena`].
//!
//! Nodes live in arena slots and link to each other by [`SlotId`], so a
//! handle stays valid while the node moves around the list and no raw
//! pointers are involved. The recency engine keeps the most recently used
//! entry at the front and the least recently used entry at the back.
//!
//! ```text
//!   ends: Some(Ends { front: id_1, back: id_3 })
//!
//!   front (MRU)                               back (LRU)
//!     [id_1] ──next──► [id_2] ──next──► [id_3]
//!     [id_1] ◄──prev── [id_2] ◄──prev── [id_3]
//! ```
//!
//! `front` and `back` are stored together, so an empty list has neither and a
//! non-empty list always has both.
//!
//! All operations are O(1) except iteration, `take_all` and
//! `check_invariants`.

use std::iter::FusedIterator;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    links: Links,
}

#[derive(Debug, Clone, Copy)]
struct Ends {
    front: SlotId,
    back: SlotId,
}

#[derive(Debug)]
pub struct IntrusiveList<T> {
    nodes: SlotArena<Node<T>>,
    ends: Option<Ends>,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotArena::with_capacity(capacity),
            ends: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ends.is_none()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.nodes.contains(id)
    }

    pub fn front_id(&self) -> Option<SlotId> {
        self.ends.map(|ends| ends.front)
    }

    pub fn back_id(&self) -> Option<SlotId> {
        self.ends.map(|ends| ends.back)
    }

    pub fn front(&self) -> Option<&T> {
        self.get(self.front_id()?)
    }

    pub fn back(&self) -> Option<&T> {
        self.get(self.back_id()?)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|node| &mut node.value)
    }

    /// Iterates front (MRU) to back (LRU). Reverse with `.rev()`.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            front: self.front_id(),
            back: self.back_id(),
            remaining: self.len(),
        }
    }

    /// Iterates back (LRU) to front (MRU).
    pub fn iter_rev(&self) -> std::iter::Rev<Iter<'_, T>> {
        self.iter().rev()
    }

    /// Inserts `value` at the front and returns its handle.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = self.nodes.insert(Node {
            value,
            links: Links::default(),
        });
        self.link_front(id);
        id
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let id = self.front_id()?;
        self.remove(id)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.back_id()?;
        self.remove(id)
    }

    /// Unlinks `id` and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.unlink(id)?;
        self.nodes.remove(id).map(|node| node.value)
    }

    /// Moves `id` to the front. Returns `false` if `id` is not in the list.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if self.front_id() == Some(id) {
            return true;
        }
        if self.unlink(id).is_none() {
            return false;
        }
        self.link_front(id);
        true
    }

    /// Empties the list and returns its values front to back.
    pub fn take_all(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len());
        let mut cursor = self.front_id();
        while let Some(id) = cursor {
            match self.nodes.remove(id) {
                Some(node) => {
                    cursor = node.links.next;
                    values.push(node.value);
                },
                None => break,
            }
        }
        self.clear();
        values
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ends = None;
    }

    fn links(&self, id: SlotId) -> Option<Links> {
        self.nodes.get(id).map(|node| node.links)
    }

    fn set_links(&mut self, id: SlotId, update: impl FnOnce(&mut Links)) {
        if let Some(node) = self.nodes.get_mut(id) {
            update(&mut node.links);
        }
    }

    /// Splices a detached node in at the front.
    fn link_front(&mut self, id: SlotId) {
        let old_front = self.front_id();
        self.set_links(id, |links| {
            links.prev = None;
            links.next = old_front;
        });
        let ends = match (old_front, self.ends) {
            (Some(front), Some(ends)) => {
                self.set_links(front, |links| links.prev = Some(id));
                Ends {
                    front: id,
                    back: ends.back,
                }
            },
            _ => Ends { front: id, back: id },
        };
        self.ends = Some(ends);
    }

    /// Splices `id` out, leaving its slot occupied and its links cleared.
    fn unlink(&mut self, id: SlotId) -> Option<()> {
        let Links { prev, next } = self.links(id)?;
        let ends = self.ends?;

        match prev {
            Some(prev) => self.set_links(prev, |links| links.next = next),
            None => debug_assert_eq!(ends.front, id),
        }
        match next {
            Some(next) => self.set_links(next, |links| links.prev = prev),
            None => debug_assert_eq!(ends.back, id),
        }
        self.ends = match (prev, next) {
            (None, None) => None,
            (None, Some(next)) => Some(Ends {
                front: next,
                back: ends.back,
            }),
            (Some(prev), None) => Some(Ends {
                front: ends.front,
                back: prev,
            }),
            (Some(_), Some(_)) => Some(ends),
        };
        self.set_links(id, |links| *links = Links::default());
        Some(())
    }

    /// Walks front to back checking link symmetry, both ends and the node count.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let Some(ends) = self.ends else {
            return if self.nodes.is_empty() {
                Ok(())
            } else {
                Err(InvariantError::new(format!(
                    "list has no ends but holds {} nodes",
                    self.nodes.len()
                )))
            };
        };

        let mut visited = 0usize;
        let mut expected_prev = None;
        let mut cursor = Some(ends.front);
        while let Some(id) = cursor {
            let links = self.links(id).ok_or_else(|| {
                InvariantError::new(format!("list links to vacant slot {}", id.index()))
            })?;
            if links.prev != expected_prev {
                return Err(InvariantError::new(format!(
                    "node {} has prev {:?}, expected {:?}",
                    id.index(),
                    links.prev.map(SlotId::index),
                    expected_prev.map(SlotId::index)
                )));
            }
            visited += 1;
            if visited > self.nodes.len() {
                return Err(InvariantError::new("cycle detected in list"));
            }
            if links.next.is_none() && id != ends.back {
                return Err(InvariantError::new(format!(
                    "walk ended at node {} but back is {}",
                    id.index(),
                    ends.back.index()
                )));
            }
            expected_prev = Some(id);
            cursor = links.next;
        }

        if visited != self.nodes.len() {
            return Err(InvariantError::new(format!(
                "walk reached {} nodes but the arena holds {}",
                visited,
                self.nodes.len()
            )));
        }
        Ok(())
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing iterator over an [`IntrusiveList`], front to back.
pub struct Iter<'a, T> {
    nodes: &'a SlotArena<Node<T>>,
    front: Option<SlotId>,
    back: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.get(self.front?)?;
        self.front = node.links.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.get(self.back?)?;
        self.back = node.links.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
