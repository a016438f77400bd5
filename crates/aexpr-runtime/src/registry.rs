#![forbid(unsafe_code)]

//! Property → interested-expression bookkeeping.
//!
//! The registry keeps both directions of the relation: which expressions
//! watch a property, and which properties an expression watches. The two
//! maps are mirrors of each other; every mutation updates both. Empty sets
//! are never stored.

use ahash::{AHashMap, AHashSet};
use aexpr_core::{ObjectId, PropertyKey};

use crate::expression::ExprId;

#[derive(Debug, Default)]
pub struct DependencyRegistry {
    interest: AHashMap<PropertyKey, AHashSet<ExprId>>,
    dependencies: AHashMap<ExprId, AHashSet<PropertyKey>>,
}

/// Handle for a single property returned by [`DependencyRegistry::watch`].
#[derive(Debug)]
pub struct Watch<'a> {
    registry: &'a mut DependencyRegistry,
    key: PropertyKey,
}

impl Watch<'_> {
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    /// Record that `expr` depends on this property. Returns `false` if it
    /// already did.
    pub fn add_interest(self, expr: ExprId) -> bool {
        let inserted = self
            .registry
            .interest
            .entry(self.key.clone())
            .or_default()
            .insert(expr);
        if inserted {
            self.registry
                .dependencies
                .entry(expr)
                .or_default()
                .insert(self.key);
        }
        inserted
    }
}

impl DependencyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, key: PropertyKey) -> Watch<'_> {
        Watch {
            registry: self,
            key,
        }
    }

    /// Drop every registration held by `expr`. Returns how many were removed.
    pub fn remove_all_interest(&mut self, expr: ExprId) -> usize {
        let Some(keys) = self.dependencies.remove(&expr) else {
            return 0;
        };
        for key in &keys {
            if let Some(set) = self.interest.get_mut(key) {
                set.remove(&expr);
                if set.is_empty() {
                    self.interest.remove(key);
                }
            }
        }
        keys.len()
    }

    /// Expressions watching `key`, in creation order.
    pub fn interested(&self, key: &PropertyKey) -> Vec<ExprId> {
        let mut ids: Vec<ExprId> = self
            .interest
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn is_interested(&self, key: &PropertyKey, expr: ExprId) -> bool {
        self.interest
            .get(key)
            .is_some_and(|set| set.contains(&expr))
    }

    /// Properties `expr` currently watches, sorted.
    pub fn dependencies_of(&self, expr: ExprId) -> Vec<PropertyKey> {
        let mut keys: Vec<PropertyKey> = self
            .dependencies
            .get(&expr)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    pub fn dependency_count(&self, expr: ExprId) -> usize {
        self.dependencies.get(&expr).map_or(0, |deps| deps.len())
    }

    /// Purge every registration on properties of `object`. Returns the
    /// number of properties dropped.
    pub fn forget_object(&mut self, object: ObjectId) -> usize {
        let keys: Vec<PropertyKey> = self
            .interest
            .keys()
            .filter(|key| key.object == object)
            .cloned()
            .collect();
        for key in &keys {
            let Some(exprs) = self.interest.remove(key) else {
                continue;
            };
            for expr in exprs {
                if let Some(deps) = self.dependencies.get_mut(&expr) {
                    deps.remove(key);
                    if deps.is_empty() {
                        self.dependencies.remove(&expr);
                    }
                }
            }
        }
        keys.len()
    }

    /// Number of watched properties.
    pub fn len(&self) -> usize {
        self.interest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interest.is_empty()
    }

    /// Number of expressions holding at least one registration.
    pub fn expression_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Both directions agree and no empty set is stored.
    pub fn is_consistent(&self) -> bool {
        let forward = self.interest.iter().all(|(key, exprs)| {
            !exprs.is_empty()
                && exprs.iter().all(|expr| {
                    self.dependencies
                        .get(expr)
                        .is_some_and(|deps| deps.contains(key))
                })
        });
        let backward = self.dependencies.iter().all(|(expr, keys)| {
            !keys.is_empty()
                && keys.iter().all(|key| {
                    self.interest
                        .get(key)
                        .is_some_and(|exprs| exprs.contains(expr))
                })
        });
        forward && backward
    }
}
