use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{AnyColumn, Column, Component};
use crate::entity::{Entities, Entity};

/// Entities and the components attached to them.
#[derive(Default)]
pub struct World {
    entities: Entities,
    columns: HashMap<TypeId, Box<dyn AnyColumn>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        self.entities.create()
    }

    /// Destroy `entity` and every component attached to it.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.destroy(entity) {
            return false;
        }
        for column in self.columns.values_mut() {
            column.clear_slot(entity.slot);
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<Column<T>>()
    }

    fn column_mut<T: Component>(&mut self) -> Option<&mut Column<T>> {
        self.columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::<Column<T>>::default())
            .as_any_mut()
            .downcast_mut::<Column<T>>()
    }

    /// Attach `component` to `entity`, returning the one it replaced.
    ///
    /// # Panics
    /// If `entity` has been despawned.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        assert!(
            self.entities.contains(entity),
            "cannot attach a component to dead entity {entity:?}"
        );
        self.column_mut::<T>()?.put(entity.slot, component)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.contains(entity) {
            return None;
        }
        self.column::<T>()?.get(entity.slot)
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.entities.contains(entity) {
            return None;
        }
        self.columns
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Column<T>>()?
            .remove(entity.slot)
    }

    /// Number of entities carrying a `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.columns.get(&TypeId::of::<T>()).map_or(0, |c| c.len())
    }

    /// Every entity carrying a `T`, in no particular order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.column::<T>()
            .into_iter()
            .flat_map(Column::entries)
            .filter_map(move |(slot, value)| Some((self.entities.resolve(slot)?, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Label(&'static str);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Parent(Entity);

    #[test]
    fn despawned_entities_lose_their_components() {
        let mut world = World::new();
        let root = world.spawn();
        let node = world.spawn();
        world.insert(node, Label("node"));
        world.insert(node, Parent(root));

        assert!(world.despawn(node));
        assert!(!world.despawn(node));
        assert!(!world.is_alive(node));
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.count::<Label>(), 0);
        assert_eq!(world.count::<Parent>(), 0);
        assert!(world.get::<Label>(node).is_none());
    }

    #[test]
    fn insert_replaces_and_remove_detaches() {
        let mut world = World::new();
        let e = world.spawn();
        assert_eq!(world.insert(e, Label("a")), None);
        assert_eq!(world.insert(e, Label("b")), Some(Label("a")));
        assert_eq!(world.get::<Label>(e), Some(&Label("b")));
        assert_eq!(world.remove::<Label>(e), Some(Label("b")));
        assert_eq!(world.remove::<Label>(e), None);
        assert!(world.remove::<Parent>(e).is_none());
    }

    #[test]
    fn iter_yields_live_handles() {
        let mut world = World::new();
        let root = world.spawn();
        let children = [world.spawn(), world.spawn(), world.spawn()];
        for child in children {
            world.insert(child, Parent(root));
        }
        world.despawn(children[1]);

        let mut found: Vec<_> = world
            .iter::<Parent>()
            .filter(|(_, p)| p.0 == root)
            .map(|(e, _)| e)
            .collect();
        found.sort();
        assert_eq!(found, vec![children[0], children[2]]);
        assert_eq!(world.iter::<Label>().count(), 0);
    }

    #[test]
    fn recycled_slots_start_empty() {
        let mut world = World::new();
        let old = world.spawn();
        world.insert(old, Label("old"));
        world.despawn(old);
        let new = world.spawn();
        assert_eq!(new.slot(), old.slot());
        assert!(world.get::<Label>(new).is_none());
    }

    #[test]
    #[should_panic(expected = "dead entity")]
    fn attaching_to_dead_entity_panics() {
        let mut world = World::new();
        let e = world.spawn();
        world.despawn(e);
        world.insert(e, Label("late"));
    }
}
