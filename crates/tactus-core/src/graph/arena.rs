//! Slot storage with stable, never-reused keys.
//!
//! Keys are handed out sequentially and never reused, while storage slots go
//! back on a free list when their entry is removed. The slot vector therefore
//! tracks the peak live population, not the number of insertions ever made.

use std::collections::HashMap;
use std::hash::Hash;

use super::connection::ConnectionId;
use super::node::NodeId;

/// Identifier type stored in an [`Arena`].
pub(crate) trait ArenaKey: Copy + Eq + Hash + Ord {
    fn from_raw(raw: u32) -> Self;
}

impl ArenaKey for NodeId {
    fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }
}

impl ArenaKey for ConnectionId {
    fn from_raw(raw: u32) -> Self {
        ConnectionId(raw)
    }
}

pub(crate) struct Arena<K, T> {
    slots: Vec<Option<(K, T)>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    next_key: u32,
}

impl<K, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            next_key: 0,
        }
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    /// Stores the value built from the new key and returns the key.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let key = K::from_raw(self.next_key);
        self.next_key += 1;

        let value = Some((key, build(key)));
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = value;
                slot
            }
            None => {
                self.slots.push(value);
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        key
    }

    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.index.remove(&key)?;
        let (_, value) = self.slots[slot].take()?;
        self.free.push(slot);
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&T> {
        let slot = *self.index.get(&key)?;
        self.slots[slot].as_ref().map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = *self.index.get(&key)?;
        self.slots[slot].as_mut().map(|(_, value)| value)
    }

    pub fn contains(&self, key: K) -> bool {
        self.index.contains_key(&key)
    }

    pub fn slot_of(&self, key: K) -> Option<usize> {
        self.index.get(&key).copied()
    }

    /// Entry stored in `slot`, if any.
    pub fn at(&self, slot: usize) -> Option<(K, &T)> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .map(|(key, value)| (*key, value))
    }

    /// Number of slots, live or free.
    pub fn slot_len(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Occupied slots ordered by key, oldest first.
    pub fn slots_by_key(&self) -> Vec<usize> {
        let mut live: Vec<(K, usize)> = self.index.iter().map(|(k, s)| (*k, *s)).collect();
        live.sort_unstable();
        live.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Live entries ordered by key.
    pub fn iter_by_key(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots_by_key()
            .into_iter()
            .filter_map(|slot| self.at(slot))
    }

    /// Drops every entry and releases the slots. Keys keep increasing.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
    }
}
