// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Client for the shared-memory object store backing the graph engine.
//!
//! The store holds every materialized graph artifact that must outlive a
//! single worker process: fragments, vertex maps, fragment groups, and
//! materialized tensors and dataframes. Objects pair a metadata tree (typed
//! key-values plus named member objects) with an opaque payload; names map
//! strings to object ids. Every mutation of shared state goes through a
//! [`Client`]; worker code never touches the backing memory directly.
//!
//! This crate implements the in-process store shared by the worker threads of
//! one engine process. The surface mirrors the IPC client a multi-process
//! deployment would hand out, which is why [`Store::open`] takes the socket
//! path even though no socket is dialed here.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use graph_types::{Error, ErrorKind};

mod group;
mod types;

pub use group::{construct_fragment_group, fragment_of_group, FRAGMENT_GROUP_TYPE};
pub use types::arrow_type_code;

/// The id of an object in the shared store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The numeric form of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The numeric form of this id as carried in a `GraphDef`.
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Recovers an id from its `GraphDef` form.
    pub fn from_i64(id: i64) -> ObjectId {
        ObjectId(id as u64)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "o{:016x}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<ObjectId, Error> {
        let hex = s.strip_prefix('o').ok_or_else(|| {
            Error::new(ErrorKind::InvalidValue, format!("malformed object id: {}", s))
        })?;
        u64::from_str_radix(hex, 16)
            .map(ObjectId)
            .map_err(|_| Error::new(ErrorKind::InvalidValue, format!("malformed object id: {}", s)))
    }
}

/// The metadata tree of a stored object: a type name, typed key-values, and
/// named member objects.
#[derive(Clone, Debug, Default)]
pub struct ObjectMeta {
    id: ObjectId,
    type_name: String,
    keyvals: BTreeMap<String, String>,
    members: BTreeMap<String, ObjectId>,
}

impl Default for ObjectId {
    fn default() -> ObjectId {
        ObjectId(0)
    }
}

impl ObjectMeta {
    /// Creates metadata for a new object of the given type.
    pub fn new<S: Into<String>>(type_name: S) -> ObjectMeta {
        ObjectMeta {
            id: ObjectId(0),
            type_name: type_name.into(),
            keyvals: BTreeMap::new(),
            members: BTreeMap::new(),
        }
    }

    /// The object's id. Zero until the object has been put.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The object's type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Sets a key-value entry, rendered with `Display`.
    pub fn set_key_value<V: fmt::Display>(&mut self, key: &str, value: V) {
        self.keyvals.insert(key.to_string(), value.to_string());
    }

    /// Reads a key-value entry, parsed with `FromStr`.
    pub fn get_key_value<T: FromStr>(&self, key: &str) -> Result<T, Error> {
        let raw = self.keyvals.get(key).ok_or_else(|| {
            Error::new(
                ErrorKind::StoreError,
                format!("object {} has no key {}", self.id, key),
            )
        })?;
        raw.parse().map_err(|_| {
            Error::new(
                ErrorKind::StoreError,
                format!("object {} key {} has malformed value {}", self.id, key, raw),
            )
        })
    }

    /// Adds a named member object.
    pub fn add_member(&mut self, name: &str, id: ObjectId) {
        self.members.insert(name.to_string(), id);
    }

    /// Looks up a named member object.
    pub fn get_member(&self, name: &str) -> Result<ObjectId, Error> {
        self.members.get(name).copied().ok_or_else(|| {
            Error::new(
                ErrorKind::StoreError,
                format!("object {} has no member {}", self.id, name),
            )
        })
    }

    /// Iterates over the named members.
    pub fn members(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.members.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// An object's payload: engine-side data shared by reference.
pub type Payload = Arc<dyn Any + Send + Sync>;

struct StoredObject {
    meta: ObjectMeta,
    payload: Payload,
    persisted: bool,
}

struct Inner {
    objects: HashMap<ObjectId, StoredObject>,
    names: HashMap<String, ObjectId>,
    next_id: u64,
}

/// A handle on one process's shared object store.
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    ipc_socket: String,
    rpc_endpoint: String,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Store")
            .field("ipc_socket", &self.ipc_socket)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens the store reachable at the given IPC socket.
    pub fn open(ipc_socket: &str, rpc_endpoint: &str) -> Store {
        Store {
            inner: Arc::new(Mutex::new(Inner {
                objects: HashMap::new(),
                names: HashMap::new(),
                next_id: 1,
            })),
            ipc_socket: ipc_socket.to_string(),
            rpc_endpoint: rpc_endpoint.to_string(),
        }
    }

    /// Creates a client for one worker.
    pub fn client(&self) -> Client {
        Client {
            inner: Arc::clone(&self.inner),
            ipc_socket: self.ipc_socket.clone(),
            rpc_endpoint: self.rpc_endpoint.clone(),
        }
    }
}

/// A worker's connection to the shared object store.
pub struct Client {
    inner: Arc<Mutex<Inner>>,
    ipc_socket: String,
    rpc_endpoint: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("ipc_socket", &self.ipc_socket)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// The IPC socket this client is connected to.
    pub fn ipc_socket(&self) -> &str {
        &self.ipc_socket
    }

    /// The store's RPC endpoint.
    pub fn rpc_endpoint(&self) -> &str {
        &self.rpc_endpoint
    }

    /// Stores an object, assigning and returning its id.
    pub fn put_object(&self, mut meta: ObjectMeta, payload: Payload) -> Result<ObjectId, Error> {
        let mut inner = self.lock()?;
        let id = ObjectId(inner.next_id);
        inner.next_id += 1;
        meta.id = id;
        inner.objects.insert(
            id,
            StoredObject {
                meta,
                payload,
                persisted: false,
            },
        );
        Ok(id)
    }

    /// Reads an object's metadata tree.
    pub fn get_meta(&self, id: ObjectId) -> Result<ObjectMeta, Error> {
        let inner = self.lock()?;
        inner
            .objects
            .get(&id)
            .map(|o| o.meta.clone())
            .ok_or_else(|| missing(id))
    }

    /// Reads an object's payload.
    pub fn get_payload(&self, id: ObjectId) -> Result<Payload, Error> {
        let inner = self.lock()?;
        inner
            .objects
            .get(&id)
            .map(|o| Arc::clone(&o.payload))
            .ok_or_else(|| missing(id))
    }

    /// Reads an object's payload, downcast to a concrete type.
    pub fn get_payload_as<T: Any + Send + Sync>(&self, id: ObjectId) -> Result<Arc<T>, Error> {
        let payload = self.get_payload(id)?;
        payload.downcast::<T>().map_err(|_| {
            Error::new(
                ErrorKind::TypeMismatch,
                format!("object {} has unexpected payload type", id),
            )
        })
    }

    /// Marks an object as persistent, making it visible across workers.
    pub fn persist(&self, id: ObjectId) -> Result<(), Error> {
        let mut inner = self.lock()?;
        match inner.objects.get_mut(&id) {
            Some(o) => {
                o.persisted = true;
                Ok(())
            }
            None => Err(missing(id)),
        }
    }

    /// Reports whether an object exists.
    pub fn exists(&self, id: ObjectId) -> Result<bool, Error> {
        Ok(self.lock()?.objects.contains_key(&id))
    }

    /// Deletes an object and any names that point at it.
    pub fn del_data(&self, id: ObjectId) -> Result<(), Error> {
        let mut inner = self.lock()?;
        if inner.objects.remove(&id).is_none() {
            return Err(missing(id));
        }
        inner.names.retain(|_, v| *v != id);
        Ok(())
    }

    /// Binds a name to an object id.
    pub fn put_name(&self, id: ObjectId, name: &str) -> Result<(), Error> {
        let mut inner = self.lock()?;
        if !inner.objects.contains_key(&id) {
            return Err(missing(id));
        }
        inner.names.insert(name.to_string(), id);
        Ok(())
    }

    /// Resolves a name to an object id.
    pub fn get_name(&self, name: &str) -> Result<ObjectId, Error> {
        let inner = self.lock()?;
        inner.names.get(name).copied().ok_or_else(|| {
            Error::new(ErrorKind::StoreError, format!("no object named {}", name))
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, Error> {
        self.inner
            .lock()
            .map_err(|_| Error::new(ErrorKind::StoreError, "store mutex poisoned".to_string()))
    }
}

fn missing(id: ObjectId) -> Error {
    Error::new(ErrorKind::StoreError, format!("object {} does not exist", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let store = Store::open("/tmp/engine.sock", "127.0.0.1:9600");
        let client = store.client();

        let mut meta = ObjectMeta::new("engine::Blob");
        meta.set_key_value("length", 3usize);
        let id = client
            .put_object(meta, Arc::new(vec![1u8, 2, 3]))
            .unwrap();

        let meta = client.get_meta(id).unwrap();
        assert_eq!(meta.type_name(), "engine::Blob");
        assert_eq!(meta.get_key_value::<usize>("length").unwrap(), 3);
        let payload = client.get_payload_as::<Vec<u8>>(id).unwrap();
        assert_eq!(*payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_payload_downcast_mismatch() {
        let store = Store::open("/tmp/engine.sock", "127.0.0.1:9600");
        let client = store.client();
        let id = client
            .put_object(ObjectMeta::new("engine::Blob"), Arc::new(1u32))
            .unwrap();
        let err = client.get_payload_as::<String>(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_names_follow_deletion() {
        let store = Store::open("/tmp/engine.sock", "127.0.0.1:9600");
        let client = store.client();
        let id = client
            .put_object(ObjectMeta::new("engine::Blob"), Arc::new(()))
            .unwrap();
        client.put_name(id, "the_blob").unwrap();
        assert_eq!(client.get_name("the_blob").unwrap(), id);

        client.del_data(id).unwrap();
        assert!(!client.exists(id).unwrap());
        assert!(client.get_name("the_blob").is_err());
        assert_eq!(client.del_data(id).unwrap_err().kind(), ErrorKind::StoreError);
    }

    #[test]
    fn test_object_id_display_parse() {
        let id = ObjectId(0x1234);
        let s = id.to_string();
        assert_eq!(s, "o0000000000001234");
        assert_eq!(s.parse::<ObjectId>().unwrap(), id);
    }
}
