use super::entity::EntityRef;

/// Ordered live entities. Insertion order is also render order.
#[derive(Debug, Default)]
pub struct Registry {
    entities: Vec<EntityRef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: EntityRef) {
        self.entities.push(entity);
    }

    /// Copy of the current order, safe to iterate while the registry changes.
    pub fn snapshot(&self) -> Vec<EntityRef> {
        self.entities.clone()
    }

    /// Drop every entity marked destroyed, keeping survivors in order.
    /// Returns how many were removed.
    pub fn remove_destroyed(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| !e.is_destroyed());
        before - self.entities.len()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.entities.iter()
    }
}
