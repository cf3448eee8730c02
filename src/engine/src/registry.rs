// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The per-worker object registry.
//!
//! The registry is the only root of ownership for artifacts after
//! publication: fragment wrappers, algorithm entries, context wrappers, and
//! type utilities all live here, keyed by dispatcher-generated string ids. No
//! external code retains strong handles across command boundaries.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use graph_types::{Error, ErrorKind};

/// A string-keyed map of heterogeneous artifacts.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_set().entries(self.objects.keys()).finish()
    }
}

impl ObjectRegistry {
    /// Creates an empty registry.
    pub fn new() -> ObjectRegistry {
        ObjectRegistry::default()
    }

    /// Publishes an artifact. Fails with `DuplicateId` if the id is taken.
    pub fn put<T: Any + Send + Sync>(&mut self, id: &str, object: Arc<T>) -> Result<(), Error> {
        if self.objects.contains_key(id) {
            return Err(Error::new(
                ErrorKind::DuplicateId,
                format!("object {} already exists", id),
            ));
        }
        self.objects.insert(id.to_string(), object);
        Ok(())
    }

    /// Looks up an artifact by id and type.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, Error> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("object {} does not exist", id)))?;
        Arc::clone(object).downcast::<T>().map_err(|_| {
            Error::new(
                ErrorKind::TypeMismatch,
                format!("object {} has an unexpected type", id),
            )
        })
    }

    /// Reports whether an id is registered.
    pub fn has(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Removes an artifact. Fails with `NotFound` if the id is absent.
    pub fn remove(&mut self, id: &str) -> Result<(), Error> {
        self.objects.remove(id).map(|_| ()).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("object {} does not exist", id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let mut registry = ObjectRegistry::new();
        registry.put("graph_0", Arc::new(42u64)).unwrap();
        assert!(registry.has("graph_0"));
        assert_eq!(*registry.get::<u64>("graph_0").unwrap(), 42);

        registry.remove("graph_0").unwrap();
        assert!(!registry.has("graph_0"));
        assert_eq!(
            registry.remove("graph_0").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_duplicate_id() {
        let mut registry = ObjectRegistry::new();
        registry.put("app_0", Arc::new(1u32)).unwrap();
        let err = registry.put("app_0", Arc::new(2u32)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateId);
    }

    #[test]
    fn test_type_mismatch() {
        let mut registry = ObjectRegistry::new();
        registry.put("ctx_0", Arc::new(String::from("tensor"))).unwrap();
        let err = registry.get::<u64>("ctx_0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(
            registry.get::<u64>("ctx_1").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
