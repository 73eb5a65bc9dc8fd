//! Ordered registry of watch entities.
//!
//! An arena-backed doubly-linked list: insertion order is preserved for
//! traversal, and removal of an arbitrary entry is O(1) given its key.
//! The existence monitor sweeps the registry front-to-back and removes
//! entries whose files are gone; capturing `next_key` before removing
//! the current entry lets the sweep continue cleanly from the next
//! surviving entry without skipping or revisiting anything.
//!
//! Keys are generation-tagged: freed slots are reused, and a key held
//! past its entry's removal must miss rather than alias the slot's new
//! occupant.

use thiserror::Error;

/// Errors from registry operations.
///
/// Removing a key that is not currently in the registry is an error
/// value, never a panic; a sweep may race a `Stopped` announcement for
/// the same entity and the loser simply logs and moves on.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entry is not present in the registry")]
    NotPresent,
}

/// Stable handle to a registry entry.
///
/// Carries the slot's generation at insertion time, so a key for an
/// already-removed entry stays invalid even after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    /// Bumped on every removal; keys minted before the bump miss.
    generation: u64,
    node: Option<Node<T>>,
}

/// Ordered collection with stable keys and O(1) removal.
#[derive(Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value at the tail, returning its key.
    pub fn insert(&mut self, value: T) -> EntryKey {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        if let Some(tail) = self.tail {
            if let Some(prev) = self.slots[tail].node.as_mut() {
                prev.next = Some(index);
            }
        } else {
            self.head = Some(index);
        }
        self.tail = Some(index);
        self.len += 1;

        EntryKey {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Node behind a key, if the key is still current.
    fn node(&self, key: EntryKey) -> Option<&Node<T>> {
        let slot = self.slots.get(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.node(key).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.node.as_mut().map(|node| &mut node.value)
    }

    /// Unlink an entry and return its value.
    ///
    /// O(1). A vacant, out-of-range, or already-removed key yields
    /// `NotPresent`, including when its slot has since been reused.
    pub fn remove(&mut self, key: EntryKey) -> Result<T, RegistryError> {
        if self.node(key).is_none() {
            return Err(RegistryError::NotPresent);
        }

        let slot = &mut self.slots[key.index];
        slot.generation += 1;
        let node = slot.node.take().ok_or(RegistryError::NotPresent)?;

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.slots[prev].node.as_mut() {
                    p.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(n) = self.slots[next].node.as_mut() {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.free.push(key.index);
        self.len -= 1;
        Ok(node.value)
    }

    /// Key of the first live entry, in insertion order.
    pub fn first_key(&self) -> Option<EntryKey> {
        self.head.map(|index| EntryKey {
            index,
            generation: self.slots[index].generation,
        })
    }

    /// Key of the entry following `key`.
    ///
    /// Returns `None` past the tail or if `key` was already removed.
    /// Capture this before removing the current entry to keep a sweep
    /// going.
    pub fn next_key(&self, key: EntryKey) -> Option<EntryKey> {
        let index = self.node(key)?.next?;
        Some(EntryKey {
            index,
            generation: self.slots[index].generation,
        })
    }

    /// Read-only forward iteration over live entries.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            registry: self,
            cur: self.head,
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    registry: &'a Registry<T>,
    cur: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        let node = self.registry.slots[idx].node.as_ref()?;
        self.cur = node.next;
        Some(&node.value)
    }
}
