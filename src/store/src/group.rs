// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fragment groups: the cluster-wide set of fragments belonging to one graph,
//! tracked as a named object in the shared store.

use std::sync::Arc;

use comm::CommSpec;

use graph_types::{Error, ErrorKind};

use crate::{Client, ObjectId, ObjectMeta};

/// The store type name of a fragment group.
pub const FRAGMENT_GROUP_TYPE: &str = "engine::ArrowFragmentGroup";

/// Assembles the fragment group for a freshly persisted fragment.
///
/// Every worker contributes its local fragment's object id; worker 0 writes
/// the group object and the resulting id is agreed on by all workers. The
/// call doubles as the collective fence after the store writes that produced
/// the fragments.
pub fn construct_fragment_group(
    client: &Client,
    comm: &CommSpec,
    frag_id: ObjectId,
) -> Result<ObjectId, Error> {
    let gathered = comm.all_gather(frag_id.as_u64().to_le_bytes().to_vec())?;
    let group_id = if comm.worker_id() == 0 {
        let mut meta = ObjectMeta::new(FRAGMENT_GROUP_TYPE);
        meta.set_key_value("fnum", comm.fnum());
        for (fid, bytes) in gathered.iter().enumerate() {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[..8]);
            meta.add_member(&format!("frag_{}", fid), ObjectId::from_i64(i64::from_le_bytes(buf)));
        }
        let id = client.put_object(meta, Arc::new(()))?;
        client.persist(id)?;
        Some(id.as_u64().to_le_bytes().to_vec())
    } else {
        None
    };
    let bytes = comm.broadcast_from_root(group_id)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Ok(ObjectId::from_i64(i64::from_le_bytes(buf)))
}

/// Resolves the fragment a group tracks for the given fragment id.
pub fn fragment_of_group(
    client: &Client,
    group_id: ObjectId,
    fid: usize,
) -> Result<ObjectId, Error> {
    let meta = client.get_meta(group_id)?;
    if meta.type_name() != FRAGMENT_GROUP_TYPE {
        return Err(Error::new(
            ErrorKind::StoreError,
            format!("object {} is not a fragment group", group_id),
        ));
    }
    meta.get_member(&format!("frag_{}", fid))
}
