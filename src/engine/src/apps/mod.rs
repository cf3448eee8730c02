// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Built-in algorithms and the adapter they run against.
//!
//! Each algorithm is a bulk-synchronous loop: relax local state, exchange
//! messages keyed by destination gid, and agree on termination through an
//! all-reduce. The [`AlgoView`] adapter flattens any supported fragment
//! variant into local vertices, weighted out-edges, and an owner rule.

pub mod pagerank;
pub mod sssp;
pub mod wcc;

use std::collections::HashMap;

use graph::{
    column_f64, DynamicFragment, DynamicVertexMap, FragmentHandle, IdParser, Oid,
};
use graph_types::{Error, ErrorKind, QueryArgs};

/// A fragment flattened for bulk-synchronous execution.
pub(crate) struct AlgoView {
    /// The number of fragments.
    pub fnum: usize,
    /// Local inner vertices, in context order.
    pub vertices: Vec<u64>,
    /// Gid to local index.
    pub index: HashMap<u64, usize>,
    /// Weighted out-edges per local vertex.
    pub edges: Vec<Vec<(u64, f64)>>,
    owner: OwnerRule,
}

enum OwnerRule {
    Dynamic,
    Property(IdParser),
}

impl AlgoView {
    /// Flattens a fragment. Only projected and dynamic variants run
    /// algorithms; the labeled columnar variant must be projected first.
    pub fn build(frag: &FragmentHandle) -> Result<AlgoView, Error> {
        match frag {
            FragmentHandle::Projected(frag) => {
                let base = frag.base();
                let parser = *base.vertex_map().id_parser();
                let v_label = frag.v_label();
                let e_label = frag.e_label();
                let weight_column = frag
                    .e_prop()
                    .map(|prop| base.edge_table(e_label).columns[prop as usize].clone());
                let mut vertices = Vec::new();
                let mut edges = Vec::new();
                for offset in base.inner_vertices(v_label) {
                    vertices.push(parser.generate_id(base.fid(), v_label, offset));
                    edges.push(
                        base.out_edges(e_label, v_label, offset)
                            .iter()
                            .map(|&(dst, row)| {
                                let w = weight_column
                                    .as_ref()
                                    .and_then(|col| column_f64(col, row))
                                    .unwrap_or(1.0);
                                (dst, w)
                            })
                            .collect(),
                    );
                }
                Ok(AlgoView::assemble(
                    base.fnum(),
                    vertices,
                    edges,
                    OwnerRule::Property(parser),
                ))
            }
            FragmentHandle::Dynamic(frag) => Ok(Self::build_dynamic(frag, None)),
            FragmentHandle::DynamicProjected(frag) => {
                Ok(Self::build_dynamic(frag.base(), frag.e_prop()))
            }
            FragmentHandle::Property(_) | FragmentHandle::DynamicView(_) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "algorithms run on projected or dynamic graphs",
            )),
        }
    }

    fn build_dynamic(frag: &DynamicFragment, e_prop: Option<&str>) -> AlgoView {
        let weight_key = e_prop.unwrap_or("weight");
        let mut vertices = Vec::new();
        let mut edges = Vec::new();
        for (gid, _) in frag.inner_vertices() {
            vertices.push(gid);
            edges.push(
                frag.out_edges(gid)
                    .into_iter()
                    .map(|(dst, attrs)| {
                        let w = attrs.get(weight_key).and_then(|v| v.as_f64()).unwrap_or(1.0);
                        (dst, w)
                    })
                    .collect(),
            );
        }
        AlgoView::assemble(frag.fnum(), vertices, edges, OwnerRule::Dynamic)
    }

    fn assemble(
        fnum: usize,
        vertices: Vec<u64>,
        edges: Vec<Vec<(u64, f64)>>,
        owner: OwnerRule,
    ) -> AlgoView {
        let index = vertices
            .iter()
            .enumerate()
            .map(|(i, gid)| (*gid, i))
            .collect();
        AlgoView {
            fnum,
            vertices,
            index,
            edges,
            owner,
        }
    }

    /// The worker owning a gid.
    pub fn owner_of(&self, gid: u64) -> usize {
        match &self.owner {
            OwnerRule::Dynamic => DynamicVertexMap::gid_fid(gid),
            OwnerRule::Property(parser) => parser.fid(gid),
        }
    }

    /// Resolves a source-vertex argument to its gid, if the vertex exists.
    pub fn resolve_source(
        &self,
        frag: &FragmentHandle,
        value: &serde_json::Value,
    ) -> Result<Option<u64>, Error> {
        match frag {
            FragmentHandle::Projected(frag) => {
                let oid = value.as_i64().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidValue,
                        format!("source vertex must be an integer: {}", value),
                    )
                })?;
                Ok(frag.base().vertex_map().global_gid(frag.v_label(), oid))
            }
            FragmentHandle::Dynamic(frag) => {
                let oid = Oid::from_json(value)?;
                Ok(frag.with_vm(|vm| vm.get_gid(&oid)))
            }
            FragmentHandle::DynamicProjected(frag) => {
                let oid = Oid::from_json(value)?;
                Ok(frag.base().with_vm(|vm| vm.get_gid(&oid)))
            }
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                "algorithms run on projected or dynamic graphs",
            )),
        }
    }
}

/// Reads a named argument from the query args.
pub(crate) fn arg<'a>(args: &'a QueryArgs, key: &str) -> Option<&'a serde_json::Value> {
    args.0.get(key)
}

/// Encodes (gid, value) message pairs.
pub(crate) fn encode_pairs(pairs: &[(u64, f64)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pairs.len() * 16);
    for (gid, value) in pairs {
        out.extend_from_slice(&gid.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Encodes (gid, gid) message pairs.
pub(crate) fn encode_id_pairs(pairs: &[(u64, u64)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pairs.len() * 16);
    for (gid, value) in pairs {
        out.extend_from_slice(&gid.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decodes (gid, gid) message pairs.
pub(crate) fn decode_id_pairs(bytes: &[u8]) -> Vec<(u64, u64)> {
    bytes
        .chunks_exact(16)
        .map(|chunk| {
            let mut gid = [0u8; 8];
            let mut value = [0u8; 8];
            gid.copy_from_slice(&chunk[..8]);
            value.copy_from_slice(&chunk[8..]);
            (u64::from_le_bytes(gid), u64::from_le_bytes(value))
        })
        .collect()
}

/// Decodes (gid, value) message pairs.
pub(crate) fn decode_pairs(bytes: &[u8]) -> Vec<(u64, f64)> {
    bytes
        .chunks_exact(16)
        .map(|chunk| {
            let mut gid = [0u8; 8];
            let mut value = [0u8; 8];
            gid.copy_from_slice(&chunk[..8]);
            value.copy_from_slice(&chunk[8..]);
            (u64::from_le_bytes(gid), f64::from_le_bytes(value))
        })
        .collect()
}
