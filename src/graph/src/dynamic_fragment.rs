// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The mutable dynamic fragment.
//!
//! A dynamic fragment holds its shard of a networkx-style graph: vertices and
//! edges carry free-form JSON attribute maps, and the graph mutates in place
//! under the modify commands. Mutations arrive identically on every worker;
//! each worker applies the global vertex-map updates and materializes only the
//! data it owns. An edge is owned by the fragment owning its source (directed)
//! or its smaller endpoint (undirected), which is the rule behind local edge
//! counts.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::{Map, Value};

use graph_types::{Error, ErrorKind, ModifyType};

use crate::dynamic_vertex_map::DynamicVertexMap;
use crate::oid::{partition_for, Oid};

/// A JSON attribute map.
pub type Attrs = Map<String, Value>;

#[derive(Clone, Debug, Default)]
struct Inner {
    fid: usize,
    fnum: usize,
    directed: bool,
    vm: DynamicVertexMap,
    // Inner gid -> attributes.
    vertex_data: HashMap<u64, Attrs>,
    // Inner src gid -> dst gid -> attributes. For undirected graphs this is
    // the full neighbor set of each inner vertex.
    adj_out: HashMap<u64, BTreeMap<u64, Attrs>>,
    // Inner dst gid -> src gid -> attributes; directed graphs only.
    adj_in: HashMap<u64, BTreeMap<u64, Attrs>>,
}

/// A worker's shard of a mutable dynamic graph.
#[derive(Debug, Default)]
pub struct DynamicFragment {
    inner: RwLock<Inner>,
}

fn parse_attrs(rest: Option<&str>) -> Result<Attrs, Error> {
    match rest.map(str::trim) {
        None | Some("") => Ok(Attrs::new()),
        Some(json) => match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::new(
                ErrorKind::InvalidValue,
                format!("attributes must be a JSON object: {}", other),
            )),
            Err(e) => Err(Error::new(
                ErrorKind::InvalidValue,
                format!("malformed attributes: {}", e),
            )),
        },
    }
}

/// Parses a vertex line: `<oid>` or `<oid> <json-attrs>`.
pub fn parse_vertex_line(line: &str) -> Result<(Oid, Attrs), Error> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::new(ErrorKind::InvalidValue, "empty vertex line"));
    }
    match line.split_once(char::is_whitespace) {
        None => Ok((Oid::parse_token(line), Attrs::new())),
        Some((token, rest)) => Ok((Oid::parse_token(token), parse_attrs(Some(rest))?)),
    }
}

/// Parses an edge line: `<src> <dst>` or `<src> <dst> <json-attrs>`.
pub fn parse_edge_line(line: &str) -> Result<(Oid, Oid, Attrs), Error> {
    let line = line.trim();
    let (src, rest) = line.split_once(char::is_whitespace).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidValue,
            format!("edge line needs two endpoints: {}", line),
        )
    })?;
    let rest = rest.trim();
    match rest.split_once(char::is_whitespace) {
        None => {
            if rest.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("edge line needs two endpoints: {}", line),
                ));
            }
            Ok((Oid::parse_token(src), Oid::parse_token(rest), Attrs::new()))
        }
        Some((dst, attrs)) => Ok((
            Oid::parse_token(src),
            Oid::parse_token(dst),
            parse_attrs(Some(attrs))?,
        )),
    }
}

impl DynamicFragment {
    /// Creates an empty fragment.
    pub fn new(fid: usize, fnum: usize, directed: bool) -> DynamicFragment {
        DynamicFragment {
            inner: RwLock::new(Inner {
                fid,
                fnum,
                directed,
                vm: DynamicVertexMap::new(fnum),
                ..Inner::default()
            }),
        }
    }

    pub(crate) fn from_parts(
        fid: usize,
        fnum: usize,
        directed: bool,
        vm: DynamicVertexMap,
        vertex_data: HashMap<u64, Attrs>,
        adj_out: HashMap<u64, BTreeMap<u64, Attrs>>,
        adj_in: HashMap<u64, BTreeMap<u64, Attrs>>,
    ) -> DynamicFragment {
        DynamicFragment {
            inner: RwLock::new(Inner {
                fid,
                fnum,
                directed,
                vm,
                vertex_data,
                adj_out,
                adj_in,
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap()
    }

    /// This fragment's id.
    pub fn fid(&self) -> usize {
        self.read().fid
    }

    /// The total number of fragments.
    pub fn fnum(&self) -> usize {
        self.read().fnum
    }

    /// Whether edges are directed.
    pub fn directed(&self) -> bool {
        self.read().directed
    }

    /// Runs `f` against the global vertex map.
    pub fn with_vm<R>(&self, f: impl FnOnce(&DynamicVertexMap) -> R) -> R {
        f(&self.read().vm)
    }

    /// Applies vertex mutations. Every worker updates the global vertex map;
    /// only the owner materializes attribute data.
    pub fn modify_vertices(&self, lines: &[String], modify_type: ModifyType) -> Result<(), Error> {
        let mut inner = self.write();
        for line in lines {
            let (oid, attrs) = parse_vertex_line(line)?;
            match modify_type {
                ModifyType::Add | ModifyType::Update => {
                    let gid = inner.add_vertex_global(&oid);
                    if DynamicVertexMap::gid_fid(gid) == inner.fid {
                        let data = inner.vertex_data.entry(gid).or_default();
                        for (k, v) in attrs {
                            data.insert(k, v);
                        }
                    }
                }
                ModifyType::Delete => {
                    if let Some(gid) = inner.vm.remove_vertex(&oid) {
                        inner.drop_vertex(gid);
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies edge mutations. Endpoints are created on demand; each worker
    /// stores the adjacency entries whose key vertex it owns.
    pub fn modify_edges(&self, lines: &[String], modify_type: ModifyType) -> Result<(), Error> {
        let mut inner = self.write();
        for line in lines {
            let (src, dst, attrs) = parse_edge_line(line)?;
            match modify_type {
                ModifyType::Add | ModifyType::Update => {
                    let src_gid = inner.add_vertex_global(&src);
                    let dst_gid = inner.add_vertex_global(&dst);
                    for gid in [src_gid, dst_gid] {
                        if DynamicVertexMap::gid_fid(gid) == inner.fid {
                            inner.vertex_data.entry(gid).or_default();
                        }
                    }
                    inner.add_edge(src_gid, dst_gid, attrs);
                }
                ModifyType::Delete => {
                    let (src_gid, dst_gid) = {
                        (inner.vm.get_gid(&src), inner.vm.get_gid(&dst))
                    };
                    if let (Some(src_gid), Some(dst_gid)) = (src_gid, dst_gid) {
                        inner.remove_edge(src_gid, dst_gid);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drops every vertex and edge, resetting the vertex map.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.vm = DynamicVertexMap::new(inner.fnum);
        inner.vertex_data.clear();
        inner.adj_out.clear();
        inner.adj_in.clear();
    }

    /// Drops every edge, keeping the vertices.
    pub fn clear_edges(&self) {
        let mut inner = self.write();
        inner.adj_out.clear();
        inner.adj_in.clear();
    }

    /// The number of vertices owned by this fragment.
    pub fn node_num_local(&self) -> usize {
        self.read().vertex_data.len()
    }

    /// The number of edges whose canonical endpoint this fragment owns.
    pub fn edge_num_local(&self) -> usize {
        let inner = self.read();
        if inner.directed {
            inner.adj_out.values().map(|m| m.len()).sum()
        } else {
            inner
                .adj_out
                .iter()
                .map(|(u, m)| m.keys().filter(|v| *u <= **v).count())
                .sum()
        }
    }

    /// Answers a membership probe if this fragment is the oid's owner.
    pub fn has_node_local(&self, oid: &Oid) -> Option<bool> {
        let inner = self.read();
        if inner.vm.owner_of(oid) == inner.fid {
            Some(inner.vm.contains(oid))
        } else {
            None
        }
    }

    /// Returns a vertex's attributes if this fragment owns it.
    pub fn node_data_local(&self, oid: &Oid) -> Option<Option<Attrs>> {
        let inner = self.read();
        if inner.vm.owner_of(oid) != inner.fid {
            return None;
        }
        Some(
            inner
                .vm
                .get_gid(oid)
                .and_then(|gid| inner.vertex_data.get(&gid).cloned()),
        )
    }

    /// Answers an edge membership probe if this fragment owns the source.
    pub fn has_edge_local(&self, u: &Oid, v: &Oid) -> Option<bool> {
        let inner = self.read();
        if inner.vm.owner_of(u) != inner.fid {
            return None;
        }
        let present = match (inner.vm.get_gid(u), inner.vm.get_gid(v)) {
            (Some(ug), Some(vg)) => inner
                .adj_out
                .get(&ug)
                .map_or(false, |m| m.contains_key(&vg)),
            _ => false,
        };
        Some(present)
    }

    /// Returns an edge's attributes if this fragment owns the source.
    pub fn edge_data_local(&self, u: &Oid, v: &Oid) -> Option<Option<Attrs>> {
        let inner = self.read();
        if inner.vm.owner_of(u) != inner.fid {
            return None;
        }
        let data = match (inner.vm.get_gid(u), inner.vm.get_gid(v)) {
            (Some(ug), Some(vg)) => inner.adj_out.get(&ug).and_then(|m| m.get(&vg).cloned()),
            _ => None,
        };
        Some(data)
    }

    /// Returns a vertex's degree if this fragment owns it.
    pub fn degree_local(&self, oid: &Oid) -> Option<Option<usize>> {
        let inner = self.read();
        if inner.vm.owner_of(oid) != inner.fid {
            return None;
        }
        Some(inner.vm.get_gid(oid).map(|gid| {
            let out = inner.adj_out.get(&gid).map_or(0, |m| m.len());
            let r#in = if inner.directed {
                inner.adj_in.get(&gid).map_or(0, |m| m.len())
            } else {
                0
            };
            out + r#in
        }))
    }

    /// Returns a vertex's neighbor oids if this fragment owns it.
    pub fn neighbors_local(&self, oid: &Oid) -> Option<Option<Vec<Value>>> {
        let inner = self.read();
        if inner.vm.owner_of(oid) != inner.fid {
            return None;
        }
        Some(inner.vm.get_gid(oid).map(|gid| {
            inner
                .adj_out
                .get(&gid)
                .map(|m| {
                    m.keys()
                        .filter_map(|v| inner.vm.get_oid(*v).map(Oid::to_json))
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    /// This fragment's live inner vertices in lid order.
    pub fn inner_vertices(&self) -> Vec<(u64, Oid)> {
        let inner = self.read();
        inner
            .vm
            .iter_fragment(inner.fid)
            .map(|(gid, oid)| (gid, oid.clone()))
            .collect()
    }

    /// The attributes of an inner vertex.
    pub fn vertex_attrs(&self, gid: u64) -> Option<Attrs> {
        self.read().vertex_data.get(&gid).cloned()
    }

    /// The out-edges of an inner vertex. For undirected graphs this is the
    /// full neighbor set.
    pub fn out_edges(&self, gid: u64) -> Vec<(u64, Attrs)> {
        self.read()
            .adj_out
            .get(&gid)
            .map(|m| m.iter().map(|(v, a)| (*v, a.clone())).collect())
            .unwrap_or_default()
    }

    /// The edges this fragment canonically owns, as (src gid, dst gid, attrs).
    pub fn canonical_edges(&self) -> Vec<(u64, u64, Attrs)> {
        let inner = self.read();
        let mut out = Vec::new();
        for (u, m) in &inner.adj_out {
            for (v, attrs) in m {
                if inner.directed || *u <= *v {
                    out.push((*u, *v, attrs.clone()));
                }
            }
        }
        out.sort_by_key(|(u, v, _)| (*u, *v));
        out
    }

    /// Builds the node- or edge-induced subgraph.
    ///
    /// `vertices` must arrive in the same order on every worker; lids of the
    /// new vertex map are assigned in that order. With a non-empty `edges`
    /// list the subgraph keeps exactly those edges (endpoints implied);
    /// otherwise it keeps every edge with both endpoints selected.
    pub fn induce_subgraph(
        &self,
        vertices: &[Oid],
        edges: &[(Oid, Oid)],
    ) -> Result<DynamicFragment, Error> {
        let inner = self.read();
        let mut sub_vm = DynamicVertexMap::new(inner.fnum);
        for oid in vertices {
            if inner.vm.contains(oid) {
                let fid = inner.vm.owner_of(oid);
                sub_vm.add_vertex(fid, oid.clone());
            }
        }

        let mut sub = Inner {
            fid: inner.fid,
            fnum: inner.fnum,
            directed: inner.directed,
            vm: sub_vm,
            ..Inner::default()
        };
        // Vertex data for owned survivors.
        let owned: Vec<(u64, Oid)> = sub
            .vm
            .iter_fragment(inner.fid)
            .map(|(gid, oid)| (gid, oid.clone()))
            .collect();
        for (new_gid, oid) in owned {
            if let Some(old_gid) = inner.vm.get_gid(&oid) {
                if let Some(data) = inner.vertex_data.get(&old_gid) {
                    sub.vertex_data.insert(new_gid, data.clone());
                }
            }
        }

        let mut sub_adj_out: HashMap<u64, BTreeMap<u64, Attrs>> = HashMap::new();
        let mut sub_adj_in: HashMap<u64, BTreeMap<u64, Attrs>> = HashMap::new();
        if edges.is_empty() {
            // Node induced: keep edges with both endpoints selected.
            for (old_u, m) in &inner.adj_out {
                let u_oid = match inner.vm.get_oid(*old_u) {
                    Some(oid) => oid,
                    None => continue,
                };
                let new_u = match sub.vm.get_gid(u_oid) {
                    Some(gid) => gid,
                    None => continue,
                };
                for (old_v, attrs) in m {
                    let v_oid = match inner.vm.get_oid(*old_v) {
                        Some(oid) => oid,
                        None => continue,
                    };
                    if let Some(new_v) = sub.vm.get_gid(v_oid) {
                        sub_adj_out.entry(new_u).or_default().insert(new_v, attrs.clone());
                    }
                }
            }
            for (old_v, m) in &inner.adj_in {
                let v_oid = match inner.vm.get_oid(*old_v) {
                    Some(oid) => oid,
                    None => continue,
                };
                let new_v = match sub.vm.get_gid(v_oid) {
                    Some(gid) => gid,
                    None => continue,
                };
                for (old_u, attrs) in m {
                    let u_oid = match inner.vm.get_oid(*old_u) {
                        Some(oid) => oid,
                        None => continue,
                    };
                    if let Some(new_u) = sub.vm.get_gid(u_oid) {
                        sub_adj_in.entry(new_v).or_default().insert(new_u, attrs.clone());
                    }
                }
            }
        } else {
            for (u, v) in edges {
                let (new_u, new_v) = match (sub.vm.get_gid(u), sub.vm.get_gid(v)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                // Each side mirrors from the structures it owns.
                if let (Some(old_u), Some(old_v)) = (inner.vm.get_gid(u), inner.vm.get_gid(v)) {
                    if DynamicVertexMap::gid_fid(old_u) == inner.fid {
                        if let Some(attrs) = inner.adj_out.get(&old_u).and_then(|m| m.get(&old_v)) {
                            sub_adj_out.entry(new_u).or_default().insert(new_v, attrs.clone());
                        }
                    }
                    if DynamicVertexMap::gid_fid(old_v) == inner.fid {
                        if inner.directed {
                            if let Some(attrs) =
                                inner.adj_in.get(&old_v).and_then(|m| m.get(&old_u))
                            {
                                sub_adj_in.entry(new_v).or_default().insert(new_u, attrs.clone());
                            }
                        } else if let Some(attrs) =
                            inner.adj_out.get(&old_v).and_then(|m| m.get(&old_u))
                        {
                            sub_adj_out.entry(new_v).or_default().insert(new_u, attrs.clone());
                        }
                    }
                }
            }
        }
        sub.adj_out = sub_adj_out;
        sub.adj_in = sub_adj_in;
        Ok(DynamicFragment {
            inner: RwLock::new(sub),
        })
    }

    /// Duplicates this fragment onto a freshly copied vertex map.
    ///
    /// `identical` preserves attribute data; `reset` keeps the structure with
    /// empty attribute maps.
    pub fn copy(&self, copy_type: &str) -> Result<DynamicFragment, Error> {
        let inner = self.read();
        let vm = inner.vm.copy_parallel();
        let reset = match copy_type {
            "identical" => false,
            "reset" => true,
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("unknown copy type: {}", other),
                ));
            }
        };
        let strip = |adj: &HashMap<u64, BTreeMap<u64, Attrs>>| {
            if reset {
                adj.iter()
                    .map(|(k, m)| (*k, m.keys().map(|v| (*v, Attrs::new())).collect()))
                    .collect()
            } else {
                adj.clone()
            }
        };
        Ok(DynamicFragment {
            inner: RwLock::new(Inner {
                fid: inner.fid,
                fnum: inner.fnum,
                directed: inner.directed,
                vm,
                vertex_data: if reset {
                    inner.vertex_data.keys().map(|k| (*k, Attrs::new())).collect()
                } else {
                    inner.vertex_data.clone()
                },
                adj_out: strip(&inner.adj_out),
                adj_in: strip(&inner.adj_in),
            }),
        })
    }

    /// Produces the directed counterpart of this fragment on a freshly copied
    /// vertex map. Each undirected edge becomes a pair of arcs.
    pub fn to_directed(&self) -> DynamicFragment {
        let inner = self.read();
        let vm = inner.vm.copy_parallel();
        let (adj_out, adj_in) = if inner.directed {
            (inner.adj_out.clone(), inner.adj_in.clone())
        } else {
            // The undirected adjacency is symmetric, so each inner vertex's
            // neighbor set doubles as both arc directions.
            (inner.adj_out.clone(), inner.adj_out.clone())
        };
        DynamicFragment {
            inner: RwLock::new(Inner {
                fid: inner.fid,
                fnum: inner.fnum,
                directed: true,
                vm,
                vertex_data: inner.vertex_data.clone(),
                adj_out,
                adj_in,
            }),
        }
    }

    /// Produces the undirected counterpart of this fragment on a freshly
    /// copied vertex map. Arc pairs collapse into one edge.
    pub fn to_undirected(&self) -> DynamicFragment {
        let inner = self.read();
        let vm = inner.vm.copy_parallel();
        let mut adj_out = inner.adj_out.clone();
        if inner.directed {
            for (v, srcs) in &inner.adj_in {
                let m = adj_out.entry(*v).or_default();
                for (u, attrs) in srcs {
                    m.entry(*u).or_insert_with(|| attrs.clone());
                }
            }
        }
        DynamicFragment {
            inner: RwLock::new(Inner {
                fid: inner.fid,
                fnum: inner.fnum,
                directed: false,
                vm,
                vertex_data: inner.vertex_data.clone(),
                adj_out,
                adj_in: HashMap::new(),
            }),
        }
    }
}

impl Inner {
    fn add_vertex_global(&mut self, oid: &Oid) -> u64 {
        if let Some(gid) = self.vm.get_gid(oid) {
            return gid;
        }
        let fid = partition_for(oid, self.fnum);
        self.vm.add_vertex(fid, oid.clone())
    }

    fn add_edge(&mut self, src_gid: u64, dst_gid: u64, attrs: Attrs) {
        if self.directed {
            if DynamicVertexMap::gid_fid(src_gid) == self.fid {
                self.adj_out
                    .entry(src_gid)
                    .or_default()
                    .insert(dst_gid, attrs.clone());
            }
            if DynamicVertexMap::gid_fid(dst_gid) == self.fid {
                self.adj_in.entry(dst_gid).or_default().insert(src_gid, attrs);
            }
        } else {
            if DynamicVertexMap::gid_fid(src_gid) == self.fid {
                self.adj_out
                    .entry(src_gid)
                    .or_default()
                    .insert(dst_gid, attrs.clone());
            }
            if DynamicVertexMap::gid_fid(dst_gid) == self.fid {
                self.adj_out.entry(dst_gid).or_default().insert(src_gid, attrs);
            }
        }
    }

    fn remove_edge(&mut self, src_gid: u64, dst_gid: u64) {
        if let Some(m) = self.adj_out.get_mut(&src_gid) {
            m.remove(&dst_gid);
        }
        if self.directed {
            if let Some(m) = self.adj_in.get_mut(&dst_gid) {
                m.remove(&src_gid);
            }
        } else if let Some(m) = self.adj_out.get_mut(&dst_gid) {
            m.remove(&src_gid);
        }
    }

    fn drop_vertex(&mut self, gid: u64) {
        self.vertex_data.remove(&gid);
        self.adj_out.remove(&gid);
        self.adj_in.remove(&gid);
        for m in self.adj_out.values_mut() {
            m.remove(&gid);
        }
        for m in self.adj_in.values_mut() {
            m.remove(&gid);
        }
    }
}

/// The supported read-only view modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewType {
    /// Every arc flipped.
    Reversed,
}

/// Parses a view type string.
pub fn parse_view_type(s: &str) -> Result<ViewType, Error> {
    match s {
        "reversed" => Ok(ViewType::Reversed),
        other => Err(Error::new(
            ErrorKind::InvalidValue,
            format!("unknown view type: {}", other),
        )),
    }
}

/// A read-only view over a dynamic fragment.
#[derive(Debug)]
pub struct DynamicFragmentView {
    base: std::sync::Arc<DynamicFragment>,
    view_type: ViewType,
}

impl DynamicFragmentView {
    /// Creates a view over `base`.
    pub fn new(base: std::sync::Arc<DynamicFragment>, view_type: ViewType) -> DynamicFragmentView {
        DynamicFragmentView { base, view_type }
    }

    /// The fragment under the view.
    pub fn base(&self) -> &std::sync::Arc<DynamicFragment> {
        &self.base
    }

    /// The view's mode.
    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    /// The number of vertices owned by this fragment.
    pub fn node_num_local(&self) -> usize {
        self.base.node_num_local()
    }

    /// The out-edges of an inner vertex under the view.
    pub fn out_edges(&self, gid: u64) -> Vec<(u64, Attrs)> {
        match self.view_type {
            // A reversed view serves the base's in-adjacency as out-edges.
            ViewType::Reversed => {
                let inner = self.base.read();
                inner
                    .adj_in
                    .get(&gid)
                    .map(|m| m.iter().map(|(v, a)| (*v, a.clone())).collect())
                    .unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn single_fragment(directed: bool) -> DynamicFragment {
        DynamicFragment::new(0, 1, directed)
    }

    #[test]
    fn test_modify_vertices_and_edges() {
        let frag = single_fragment(true);
        frag.modify_vertices(&lines(&["1", "2", "3"]), ModifyType::Add)
            .unwrap();
        frag.modify_edges(&lines(&["1 2", "2 3"]), ModifyType::Add)
            .unwrap();
        assert_eq!(frag.node_num_local(), 3);
        assert_eq!(frag.edge_num_local(), 2);

        frag.modify_edges(&lines(&["1 2"]), ModifyType::Delete).unwrap();
        assert_eq!(frag.edge_num_local(), 1);

        frag.modify_vertices(&lines(&["3"]), ModifyType::Delete).unwrap();
        assert_eq!(frag.node_num_local(), 2);
        assert_eq!(frag.edge_num_local(), 0);
    }

    #[test]
    fn test_vertex_attrs_merge() {
        let frag = single_fragment(false);
        frag.modify_vertices(&lines(&[r#"1 {"color": "red"}"#]), ModifyType::Add)
            .unwrap();
        frag.modify_vertices(&lines(&[r#"1 {"size": 3}"#]), ModifyType::Update)
            .unwrap();
        let data = frag.node_data_local(&Oid::Int(1)).unwrap().unwrap();
        assert_eq!(data.get("color"), Some(&serde_json::json!("red")));
        assert_eq!(data.get("size"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_undirected_edge_counted_once() {
        let frag = single_fragment(false);
        frag.modify_edges(&lines(&["1 2"]), ModifyType::Add).unwrap();
        assert_eq!(frag.edge_num_local(), 1);
        assert_eq!(frag.has_edge_local(&Oid::Int(1), &Oid::Int(2)), Some(true));
        assert_eq!(frag.has_edge_local(&Oid::Int(2), &Oid::Int(1)), Some(true));
    }

    #[test]
    fn test_induce_subgraph_on_disconnected_selection() {
        let frag = single_fragment(false);
        frag.modify_vertices(&lines(&["1", "2", "3", "4", "5"]), ModifyType::Add)
            .unwrap();
        frag.modify_edges(&lines(&["1 2", "2 3", "4 5"]), ModifyType::Add)
            .unwrap();
        let sub = frag
            .induce_subgraph(&[Oid::Int(1), Oid::Int(2), Oid::Int(3)], &[])
            .unwrap();
        assert_eq!(sub.node_num_local(), 3);
        assert_eq!(sub.edge_num_local(), 2);
    }

    #[test]
    fn test_copy_reset_keeps_structure() {
        let frag = single_fragment(true);
        frag.modify_vertices(&lines(&[r#"1 {"x": 1}"#, "2"]), ModifyType::Add)
            .unwrap();
        frag.modify_edges(&lines(&[r#"1 2 {"w": 2}"#]), ModifyType::Add)
            .unwrap();

        let copy = frag.copy("reset").unwrap();
        assert_eq!(copy.node_num_local(), 2);
        assert_eq!(copy.edge_num_local(), 1);
        let data = copy.node_data_local(&Oid::Int(1)).unwrap().unwrap();
        assert!(data.is_empty());

        assert_eq!(
            frag.copy("elsewise").unwrap_err().kind(),
            ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_directed_round_trip_preserves_edges() {
        let frag = single_fragment(false);
        frag.modify_vertices(&lines(&["1", "2", "3"]), ModifyType::Add)
            .unwrap();
        frag.modify_edges(&lines(&["1 2", "2 3"]), ModifyType::Add)
            .unwrap();

        let directed = frag.to_directed();
        assert!(directed.directed());
        // Each undirected edge becomes two arcs.
        assert_eq!(directed.edge_num_local(), 4);

        let back = directed.to_undirected();
        assert!(!back.directed());
        assert_eq!(back.node_num_local(), 3);
        assert_eq!(back.edge_num_local(), 2);
    }
}
