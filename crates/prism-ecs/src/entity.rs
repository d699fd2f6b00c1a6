use std::collections::VecDeque;
use std::fmt;

/// Identifies an object in a [`World`](crate::World).
///
/// The slot half is reused after the entity is destroyed; the generation half
/// changes on every reuse so old handles stop resolving.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl Entity {
    pub fn from_raw(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}@{})", self.slot, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.slot, self.generation)
    }
}

#[derive(Clone, Copy)]
struct Slot {
    generation: u32,
    occupied: bool,
}

/// Slot table of a world.
///
/// Freed slots are recycled oldest first, so a slot released by one asset is
/// not immediately handed to the next one.
#[derive(Default)]
pub(crate) struct Entities {
    slots: Vec<Slot>,
    vacant: VecDeque<u32>,
    live: usize,
}

impl Entities {
    pub fn create(&mut self) -> Entity {
        self.live += 1;
        match self.vacant.pop_front() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.occupied = true;
                Entity::from_raw(slot, entry.generation)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupied: true,
                });
                Entity::from_raw(slot, 0)
            }
        }
    }

    /// Free the slot of `entity`. `false` if the handle was already stale.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let entry = &mut self.slots[entity.slot as usize];
        entry.occupied = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push_back(entity.slot);
        self.live -= 1;
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.slot as usize)
            .is_some_and(|s| s.occupied && s.generation == entity.generation)
    }

    /// The live entity occupying `slot`, if any.
    pub fn resolve(&self, slot: u32) -> Option<Entity> {
        let entry = self.slots.get(slot as usize)?;
        entry
            .occupied
            .then(|| Entity::from_raw(slot, entry.generation))
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
