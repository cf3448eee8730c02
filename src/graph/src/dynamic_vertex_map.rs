// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The global vertex map of a dynamic graph.

use std::collections::HashMap;

use ore::thread;

use crate::oid::{partition_for, Oid};

const LID_BITS: u32 = 48;

/// Translates between original ids and global ids for every fragment of a
/// dynamic graph.
///
/// Every worker holds the full map. New vertices are placed by oid hash;
/// vertices carried over from a conversion keep their source fragment, so
/// lookups go through the map rather than the partitioner.
#[derive(Clone, Debug, Default)]
pub struct DynamicVertexMap {
    fnum: usize,
    // [fid] -> oid by lid; holes are deleted vertices.
    oids: Vec<Vec<Option<Oid>>>,
    // [fid] -> oid -> lid.
    o2l: Vec<HashMap<Oid, u64>>,
}

impl DynamicVertexMap {
    /// Creates an empty map for `fnum` fragments.
    pub fn new(fnum: usize) -> DynamicVertexMap {
        DynamicVertexMap {
            fnum,
            oids: vec![Vec::new(); fnum],
            o2l: vec![HashMap::new(); fnum],
        }
    }

    /// The number of fragments.
    pub fn fnum(&self) -> usize {
        self.fnum
    }

    /// The fragment a new vertex with this oid would be placed on, or the
    /// fragment an existing vertex lives on.
    pub fn owner_of(&self, oid: &Oid) -> usize {
        for fid in 0..self.fnum {
            if self.o2l[fid].contains_key(oid) {
                return fid;
            }
        }
        partition_for(oid, self.fnum)
    }

    /// Adds a vertex to the given fragment, returning its gid. Adding an
    /// existing vertex returns the existing gid.
    pub fn add_vertex(&mut self, fid: usize, oid: Oid) -> u64 {
        if let Some(lid) = self.o2l[fid].get(&oid) {
            return Self::encode(fid, *lid);
        }
        let lid = self.oids[fid].len() as u64;
        self.oids[fid].push(Some(oid.clone()));
        self.o2l[fid].insert(oid, lid);
        Self::encode(fid, lid)
    }

    /// Removes a vertex, returning its gid if it was present.
    pub fn remove_vertex(&mut self, oid: &Oid) -> Option<u64> {
        for fid in 0..self.fnum {
            if let Some(lid) = self.o2l[fid].remove(oid) {
                self.oids[fid][lid as usize] = None;
                return Some(Self::encode(fid, lid));
            }
        }
        None
    }

    /// Reports whether the map knows this oid.
    pub fn contains(&self, oid: &Oid) -> bool {
        self.o2l.iter().any(|m| m.contains_key(oid))
    }

    /// Resolves an oid to its gid.
    pub fn get_gid(&self, oid: &Oid) -> Option<u64> {
        for fid in 0..self.fnum {
            if let Some(lid) = self.o2l[fid].get(oid) {
                return Some(Self::encode(fid, *lid));
            }
        }
        None
    }

    /// Recovers the oid encoded by a gid.
    pub fn get_oid(&self, gid: u64) -> Option<&Oid> {
        let (fid, lid) = Self::decode(gid);
        self.oids.get(fid)?.get(lid as usize)?.as_ref()
    }

    /// The number of live vertices on one fragment.
    pub fn inner_vertex_size(&self, fid: usize) -> usize {
        self.o2l[fid].len()
    }

    /// Iterates the live vertices of one fragment in lid order.
    pub fn iter_fragment(&self, fid: usize) -> impl Iterator<Item = (u64, &Oid)> {
        self.oids[fid]
            .iter()
            .enumerate()
            .filter_map(move |(lid, slot)| {
                slot.as_ref().map(|oid| (Self::encode(fid, lid as u64), oid))
            })
    }

    /// Copies the map with one thread per source fragment, joined before the
    /// function returns.
    pub fn copy_parallel(&self) -> DynamicVertexMap {
        let parts = thread::fan_out(self.fnum, |fid| {
            (self.oids[fid].clone(), self.o2l[fid].clone())
        });
        let (oids, o2l) = parts.into_iter().unzip();
        DynamicVertexMap {
            fnum: self.fnum,
            oids,
            o2l,
        }
    }

    /// The fragment id encoded by a gid.
    pub fn gid_fid(gid: u64) -> usize {
        (gid >> LID_BITS) as usize
    }

    fn encode(fid: usize, lid: u64) -> u64 {
        ((fid as u64) << LID_BITS) | lid
    }

    fn decode(gid: u64) -> (usize, u64) {
        ((gid >> LID_BITS) as usize, gid & ((1 << LID_BITS) - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lookup_remove() {
        let mut vm = DynamicVertexMap::new(2);
        let a = Oid::Int(1);
        let gid = vm.add_vertex(partition_for(&a, 2), a.clone());
        assert_eq!(vm.add_vertex(partition_for(&a, 2), a.clone()), gid);
        assert_eq!(vm.get_gid(&a), Some(gid));
        assert_eq!(vm.get_oid(gid), Some(&a));

        assert_eq!(vm.remove_vertex(&a), Some(gid));
        assert!(!vm.contains(&a));
        assert_eq!(vm.get_oid(gid), None);
    }

    #[test]
    fn test_copy_parallel_preserves_gids() {
        let mut vm = DynamicVertexMap::new(3);
        let mut gids = Vec::new();
        for i in 0..30 {
            let oid = Oid::Int(i);
            gids.push((vm.add_vertex(partition_for(&oid, 3), oid.clone()), oid));
        }
        let copy = vm.copy_parallel();
        for (gid, oid) in gids {
            assert_eq!(copy.get_gid(&oid), Some(gid));
        }
    }

    #[test]
    fn test_owner_prefers_existing_placement() {
        let mut vm = DynamicVertexMap::new(4);
        let oid = Oid::Int(11);
        // Place away from the partitioner's choice, as a conversion would.
        let forced = (partition_for(&oid, 4) + 1) % 4;
        vm.add_vertex(forced, oid.clone());
        assert_eq!(vm.owner_of(&oid), forced);
    }
}
