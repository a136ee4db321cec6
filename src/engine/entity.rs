use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dsl::synth::EntityType;
use crate::error::RuntimeError;

use super::value::Value;

pub type EntityId = u64;
pub type EntityRef = Rc<Entity>;

/// A live entity instance. Fields sit behind a `RefCell` that is only ever
/// borrowed for a single read or write, so handlers may freely re-enter
/// the runtime while an entity is mid-call.
pub struct Entity {
    id: EntityId,
    ty: Rc<EntityType>,
    fields: RefCell<IndexMap<String, Value>>,
    destroyed: Cell<bool>,
}

impl Entity {
    pub fn new(id: EntityId, ty: Rc<EntityType>) -> Self {
        Self {
            id,
            ty,
            fields: RefCell::new(IndexMap::new()),
            destroyed: Cell::new(false),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> &Rc<EntityType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    pub fn get(&self, field: &str) -> Result<Value, RuntimeError> {
        self.fields
            .borrow()
            .get(field)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownField {
                entity: self.ty.name.clone(),
                field: field.to_string(),
            })
    }

    /// Write a field, creating it if the entity does not have it yet.
    pub fn set(&self, field: &str, value: Value) {
        self.fields.borrow_mut().insert(field.to_string(), value);
    }

    /// Field names in declaration (then first-assignment) order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn destroy(&self) {
        self.destroyed.set(true);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

// Fields may reference other entities (and cycles), so keep Debug shallow.
impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("type", &self.ty.name)
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}
