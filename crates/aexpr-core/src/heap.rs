#![forbid(unsafe_code)]

//! Generational object arena.
//!
//! Every observed object lives in a [`Heap`] slot and is addressed by an
//! [`ObjectId`]. Handles never keep an object alive: [`Heap::release`] frees
//! the slot and bumps its generation, so any handle still held elsewhere (the
//! dependency registry, a stale value) fails lookups with
//! [`EvalError::StaleObject`] instead of aliasing the slot's next occupant.
//!
//! # Invariants
//!
//! 1. A live slot's generation matches exactly one outstanding `ObjectId`.
//! 2. Reading a property that was never written yields `Undefined`.
//! 3. `len()` counts live objects only.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{EvalError, Result};
use crate::value::Value;

/// Generational handle to an object in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at allocation time.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Property storage of a single object.
#[derive(Debug, Clone, Default)]
pub struct Object {
    properties: AHashMap<Rc<str>, Value>,
}

impl Object {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Arena of observed objects.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty object.
    pub fn alloc(&mut self) -> ObjectId {
        self.insert(Object::default())
    }

    /// Allocate an object with the given properties.
    pub fn alloc_with<K, I>(&mut self, properties: I) -> ObjectId
    where
        K: Into<Rc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let object = Object {
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        };
        self.insert(object)
    }

    fn insert(&mut self, object: Object) -> ObjectId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    /// Free an object. Returns `false` if the handle was already stale.
    pub fn release(&mut self, id: ObjectId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation || slot.object.is_none() {
            return false;
        }
        slot.object = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        true
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.object(id).is_ok()
    }

    /// Borrow an object's storage.
    pub fn object(&self, id: ObjectId) -> Result<&Object> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_ref())
            .ok_or(EvalError::StaleObject(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_mut())
            .ok_or(EvalError::StaleObject(id))
    }

    /// Read a property; missing properties read as `Undefined`.
    pub fn get(&self, id: ObjectId, name: &str) -> Result<Value> {
        Ok(self
            .object(id)?
            .get(name)
            .cloned()
            .unwrap_or(Value::Undefined))
    }

    /// Write a property, returning the previous value if there was one.
    pub fn set(&mut self, id: ObjectId, name: &str, value: Value) -> Result<Option<Value>> {
        let object = self.object_mut(id)?;
        if let Some(slot) = object.properties.get_mut(name) {
            return Ok(Some(std::mem::replace(slot, value)));
        }
        object.properties.insert(Rc::from(name), value);
        Ok(None)
    }

    /// Property names of an object, sorted for stable output.
    pub fn keys(&self, id: ObjectId) -> Result<Vec<Rc<str>>> {
        let mut keys: Vec<Rc<str>> = self.object(id)?.properties.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
