// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The global vertex map of a labeled columnar graph.

use std::collections::HashMap;
use std::sync::Arc;

use graph_types::{Error, ErrorKind};
use store::{Client, ObjectId, ObjectMeta};

use crate::ids::IdParser;

/// The store type name of a property vertex map.
pub const VERTEX_MAP_TYPE: &str = "engine::ArrowVertexMap";

/// Translates between original ids and global ids for every fragment of a
/// labeled columnar graph.
///
/// Every worker holds the full map; the per-(fid, label) oid arrays and
/// oid→gid tables are registered as member objects in the shared store so
/// that downstream operations can check vertex-map identity by object id.
#[derive(Debug)]
pub struct PropertyVertexMap {
    fnum: usize,
    label_num: usize,
    id_parser: IdParser,
    // [fid][label] -> oids in offset order.
    oids: Vec<Vec<Vec<i64>>>,
    // [fid][label] -> oid -> offset.
    o2g: Vec<Vec<HashMap<i64, usize>>>,
    meta_id: ObjectId,
}

impl PropertyVertexMap {
    /// Builds a vertex map from per-(fid, label) oid arrays.
    pub fn build(fnum: usize, label_num: usize, oids: Vec<Vec<Vec<i64>>>) -> PropertyVertexMap {
        assert_eq!(oids.len(), fnum);
        let o2g = oids
            .iter()
            .map(|labels| {
                labels
                    .iter()
                    .map(|arr| {
                        arr.iter()
                            .enumerate()
                            .map(|(offset, oid)| (*oid, offset))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        PropertyVertexMap {
            fnum,
            label_num,
            id_parser: IdParser::new(fnum),
            oids,
            o2g,
            meta_id: ObjectId::default(),
        }
    }

    /// Registers the map and its per-(fid, label) members in the store.
    ///
    /// Fragments that share this map (projections, column additions) carry the
    /// same member object ids, which is what the add-column identity check
    /// compares.
    pub fn register(mut self, client: &Client) -> Result<Arc<PropertyVertexMap>, Error> {
        let mut meta = ObjectMeta::new(VERTEX_MAP_TYPE);
        meta.set_key_value("fnum", self.fnum);
        meta.set_key_value("label_num", self.label_num);
        for fid in 0..self.fnum {
            for label in 0..self.label_num {
                let o2g_id = client.put_object(
                    ObjectMeta::new("engine::Hashmap"),
                    Arc::new(()),
                )?;
                let oid_arrays_id = client.put_object(
                    ObjectMeta::new("engine::OidArray"),
                    Arc::new(()),
                )?;
                meta.add_member(&format!("o2g_{}_{}", fid, label), o2g_id);
                meta.add_member(&format!("oid_arrays_{}_{}", fid, label), oid_arrays_id);
            }
        }
        let id = client.put_object(meta, Arc::new(()))?;
        client.persist(id)?;
        self.meta_id = id;
        Ok(Arc::new(self))
    }

    /// The store object of this map. Zero until registered.
    pub fn meta_id(&self) -> ObjectId {
        self.meta_id
    }

    /// The number of fragments.
    pub fn fnum(&self) -> usize {
        self.fnum
    }

    /// The number of vertex labels.
    pub fn label_num(&self) -> usize {
        self.label_num
    }

    /// The gid packer for this map.
    pub fn id_parser(&self) -> &IdParser {
        &self.id_parser
    }

    /// The number of inner vertices of (fid, label).
    pub fn inner_vertex_size(&self, fid: usize, label: i32) -> usize {
        self.oids[fid][label as usize].len()
    }

    /// Resolves an oid within one fragment and label.
    pub fn get_gid(&self, fid: usize, label: i32, oid: i64) -> Option<u64> {
        self.o2g[fid][label as usize]
            .get(&oid)
            .map(|offset| self.id_parser.generate_id(fid, label, *offset))
    }

    /// Resolves an oid within one label, searching all fragments.
    pub fn global_gid(&self, label: i32, oid: i64) -> Option<u64> {
        (0..self.fnum).find_map(|fid| self.get_gid(fid, label, oid))
    }

    /// Recovers the oid encoded by a gid.
    pub fn get_oid(&self, gid: u64) -> Result<i64, Error> {
        let fid = self.id_parser.fid(gid);
        let label = self.id_parser.label(gid) as usize;
        let offset = self.id_parser.offset(gid);
        self.oids
            .get(fid)
            .and_then(|labels| labels.get(label))
            .and_then(|arr| arr.get(offset))
            .copied()
            .ok_or_else(|| {
                Error::new(ErrorKind::IllegalState, format!("gid {} is out of range", gid))
            })
    }

    /// The oids of (fid, label), in offset order.
    pub fn oids(&self, fid: usize, label: i32) -> &[i64] {
        &self.oids[fid][label as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyVertexMap {
        // Two fragments, one label; fragment 0 holds {1, 3}, fragment 1 {2}.
        PropertyVertexMap::build(2, 1, vec![vec![vec![1, 3]], vec![vec![2]]])
    }

    #[test]
    fn test_gid_round_trip() {
        let vm = sample();
        let gid = vm.get_gid(0, 0, 3).unwrap();
        assert_eq!(vm.get_oid(gid).unwrap(), 3);
        assert_eq!(vm.id_parser().fid(gid), 0);
        assert_eq!(vm.id_parser().offset(gid), 1);
        assert_eq!(vm.global_gid(0, 2), vm.get_gid(1, 0, 2));
        assert_eq!(vm.global_gid(0, 9), None);
    }

    #[test]
    fn test_inner_sizes() {
        let vm = sample();
        assert_eq!(vm.inner_vertex_size(0, 0), 2);
        assert_eq!(vm.inner_vertex_size(1, 0), 1);
    }
}
