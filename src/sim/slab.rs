//! Generational slab used for every transient entity collection
//!
//! Removal during a scan only sets a tombstone; the slot is reclaimed by
//! [`Slab::compact`] once nobody is iterating. Ids carry a generation so a
//! stale id never aliases a reused slot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to an entity stored in a [`Slab`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
    tombstone: bool,
}

#[derive(Debug, Clone)]
pub struct Slab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            slot.tombstone = false;
            return EntityId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
            tombstone: false,
        });
        EntityId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: EntityId) -> Option<&Slot<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation && s.value.is_some())
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation && s.value.is_some())
    }

    /// Live (non-tombstoned) entity
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slot(id)
            .filter(|s| !s.tombstone)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slot_mut(id)
            .filter(|s| !s.tombstone)
            .and_then(|s| s.value.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Flag for removal at the next [`Slab::compact`]. Returns false for
    /// unknown or already-flagged ids.
    pub fn mark_removed(&mut self, id: EntityId) -> bool {
        match self.slot_mut(id) {
            Some(slot) if !slot.tombstone => {
                slot.tombstone = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_marked(&self, id: EntityId) -> bool {
        self.slot(id).is_some_and(|s| s.tombstone)
    }

    /// Reclaim tombstoned slots, returning the ids that were dropped
    pub fn compact(&mut self) -> Vec<EntityId> {
        let mut removed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.tombstone {
                slot.tombstone = false;
                slot.value = None;
                self.free.push(index as u32);
                self.live -= 1;
                removed.push(EntityId {
                    index: index as u32,
                    generation: slot.generation,
                });
            }
        }
        removed
    }

    /// Number of live entities (tombstoned entries excluded)
    pub fn len(&self) -> usize {
        self.live - self.slots.iter().filter(|s| s.tombstone).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (EntityId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match &s.value {
            Some(v) if !s.tombstone => Some((
                EntityId {
                    index: i as u32,
                    generation: s.generation,
                },
                v,
            )),
            _ => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (EntityId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| match &mut s.value {
                Some(v) if !s.tombstone => Some((
                    EntityId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    v,
                )),
                _ => None,
            })
    }

    /// Snapshot of live ids, for scans that mutate the slab as they go
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.iter().map(|(_, v)| v)
    }
}
