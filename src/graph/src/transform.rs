// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Serialization of fragment selections into archives.
//!
//! Workers serialize their shard locally and gather at worker 0, whose
//! archive accumulates per-worker sections in ascending worker order. Within
//! one worker, vertices appear in the order of the fragment's inner-vertex
//! iterator.

use comm::CommSpec;

use graph_types::{Archive, Error, VertexRange};

use crate::property_fragment::PropertyFragment;

/// Appends the payload written after `old_size` by every worker to worker 0's
/// archive, in ascending worker order.
///
/// Worker 0's own payload is already in place; other workers' archives are
/// left untouched and are discarded by the dispatch policy.
pub fn gather_archives(arc: &mut Archive, comm: &CommSpec, old_size: usize) -> Result<(), Error> {
    let payload = arc.as_bytes()[old_size..].to_vec();
    let gathered = comm.gather_to_root(payload)?;
    if let Some(parts) = gathered {
        for part in parts.into_iter().skip(1) {
            arc.write_bytes(&part);
        }
    }
    Ok(())
}

/// Type-specialized serialization over one columnar fragment.
#[derive(Debug)]
pub struct TransformUtils<'a> {
    comm: &'a CommSpec,
    frag: &'a PropertyFragment,
}

impl<'a> TransformUtils<'a> {
    /// Creates transform utilities over a fragment.
    pub fn new(comm: &'a CommSpec, frag: &'a PropertyFragment) -> TransformUtils<'a> {
        TransformUtils { comm, frag }
    }

    /// Selects this fragment's inner vertices of one label, filtered by the
    /// oid range.
    pub fn select_vertices(&self, label: i32, range: &VertexRange) -> Vec<usize> {
        self.frag
            .inner_vertices(label)
            .filter(|offset| range.contains(self.frag.get_oid(label, *offset)))
            .collect()
    }

    /// Serializes the oids of the selected vertices.
    pub fn serialize_vertex_id(&self, vertices: &[usize], label: i32, arc: &mut Archive) {
        for &offset in vertices {
            arc.write_i64(self.frag.get_oid(label, offset));
        }
    }

    /// Serializes one property column of the selected vertices.
    pub fn serialize_vertex_property(
        &self,
        vertices: &[usize],
        label: i32,
        prop: i32,
        arc: &mut Archive,
    ) -> Result<(), Error> {
        let column = self.frag.vertex_column(label, prop)?;
        crate::columns::serialize_column(column, vertices, arc)
    }

    /// Serializes the label id of the selected vertices.
    pub fn serialize_vertex_label_id(&self, vertices: &[usize], label: i32, arc: &mut Archive) {
        for _ in vertices {
            arc.write_i32(label);
        }
    }

    /// The communicator in use.
    pub fn comm(&self) -> &CommSpec {
        self.comm
    }
}
