use std::any::Any;

/// Anything that can be attached to an entity.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Type-erased view of a [`Column`], so a world can clear a slot across all
/// component types.
pub(crate) trait AnyColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clear_slot(&mut self, slot: u32);
    fn len(&self) -> usize;
}

/// Components of one type, packed densely and indexed by entity slot.
pub(crate) struct Column<T> {
    /// Entity slot -> position in `values`.
    lookup: Vec<Option<u32>>,
    values: Vec<T>,
    /// Entity slot of each entry in `values`.
    owners: Vec<u32>,
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self {
            lookup: Vec::new(),
            values: Vec::new(),
            owners: Vec::new(),
        }
    }
}

impl<T: Component> Column<T> {
    fn position(&self, slot: u32) -> Option<usize> {
        self.lookup
            .get(slot as usize)
            .copied()
            .flatten()
            .map(|p| p as usize)
    }

    /// Store `value` for `slot`, handing back the value it replaced.
    pub fn put(&mut self, slot: u32, value: T) -> Option<T> {
        if let Some(position) = self.position(slot) {
            return Some(std::mem::replace(&mut self.values[position], value));
        }
        let index = slot as usize;
        if index >= self.lookup.len() {
            self.lookup.resize(index + 1, None);
        }
        self.lookup[index] = Some(self.values.len() as u32);
        self.values.push(value);
        self.owners.push(slot);
        None
    }

    pub fn get(&self, slot: u32) -> Option<&T> {
        self.position(slot).map(|p| &self.values[p])
    }

    /// Remove the value of `slot`; the last entry moves into the hole.
    pub fn remove(&mut self, slot: u32) -> Option<T> {
        let position = self.position(slot)?;
        self.lookup[slot as usize] = None;
        let value = self.values.swap_remove(position);
        self.owners.swap_remove(position);
        if let Some(&moved) = self.owners.get(position) {
            self.lookup[moved as usize] = Some(position as u32);
        }
        Some(value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &T)> {
        self.owners.iter().copied().zip(&self.values)
    }
}

impl<T: Component> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear_slot(&mut self, slot: u32) {
        self.remove(slot);
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}
