// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Converters between the columnar and dynamic representations.
//!
//! Conversion rebuilds the vertex map, then traverses every inner vertex and
//! its out-edges, dispatching property values on the columnar type. Vertices
//! keep their source fragment, so converted graphs stay aligned with the
//! worker set. The converters are collective: directed cross-fragment edges
//! are exchanged so the destination fragment learns its in-adjacency, and
//! data-dependent failures are made uniform before any such exchange so that
//! no worker is left waiting in a collective its peer abandoned.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use comm::CommSpec;
use graph_types::{Error, ErrorKind};
use store::{Client, ObjectId};

use crate::columns;
use crate::dynamic_fragment::{Attrs, DynamicFragment};
use crate::dynamic_vertex_map::DynamicVertexMap;
use crate::oid::Oid;
use crate::property_fragment::{EdgeTable, PropertyFragment};
use crate::schema::{LabelSchema, PropertyGraphSchema, PropertySchema};
use crate::vertex_map::PropertyVertexMap;

type Adjacency = HashMap<u64, BTreeMap<u64, Attrs>>;

struct LocalDynamic {
    vm: DynamicVertexMap,
    vertex_data: HashMap<u64, Attrs>,
    adj_out: Adjacency,
    adj_in: Adjacency,
    // Directed edges whose destination lives on another fragment, keyed by
    // the destination's fragment.
    outbound: Vec<Vec<(u64, u64, Attrs)>>,
}

/// Converts a columnar fragment into a dynamic fragment.
#[derive(Debug)]
pub struct ArrowToDynamicConverter<'a> {
    comm: &'a CommSpec,
}

impl<'a> ArrowToDynamicConverter<'a> {
    /// Creates a converter.
    pub fn new(comm: &'a CommSpec) -> ArrowToDynamicConverter<'a> {
        ArrowToDynamicConverter { comm }
    }

    /// Runs the conversion.
    pub fn convert(&self, src: &PropertyFragment) -> Result<DynamicFragment, Error> {
        if src.fnum() != self.comm.fnum() {
            return Err(Error::new(
                ErrorKind::IllegalState,
                format!(
                    "fragment spans {} workers but the communicator has {}",
                    src.fnum(),
                    self.comm.fnum()
                ),
            ));
        }
        // Local traversal fails on data only this worker holds; agree on the
        // outcome before entering the edge exchange.
        let local = self
            .convert_vertex_map(src)
            .and_then(|vm| self.convert_local(src, vm));
        let mut local = self.comm.uniform_result(local)?;

        if src.directed() {
            let msgs = local
                .outbound
                .drain(..)
                .map(|part| {
                    serde_json::to_vec(&part)
                        .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            for part in self.comm.exchange(msgs)? {
                let edges: Vec<(u64, u64, Attrs)> = serde_json::from_slice(&part)
                    .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))?;
                for (u_gid, v_gid, data) in edges {
                    local.adj_in.entry(v_gid).or_default().insert(u_gid, data);
                }
            }
        }

        debug!(
            fid = src.fid(),
            vertices = local.vertex_data.len(),
            "converted columnar fragment to dynamic"
        );
        Ok(DynamicFragment::from_parts(
            src.fid(),
            src.fnum(),
            src.directed(),
            local.vm,
            local.vertex_data,
            local.adj_out,
            local.adj_in,
        ))
    }

    fn convert_vertex_map(&self, src: &PropertyFragment) -> Result<DynamicVertexMap, Error> {
        let src_vm = src.vertex_map();
        let mut dst_vm = DynamicVertexMap::new(src.fnum());
        let mut seen = HashSet::new();
        for label in 0..src.vertex_label_num() as i32 {
            for fid in 0..src.fnum() {
                for &oid in src_vm.oids(fid, label) {
                    if !seen.insert(oid) {
                        return Err(Error::new(
                            ErrorKind::DataType,
                            format!("Duplicated oid {}", oid),
                        ));
                    }
                    dst_vm.add_vertex(fid, Oid::Int(oid));
                }
            }
        }
        Ok(dst_vm)
    }

    fn convert_local(
        &self,
        src: &PropertyFragment,
        dst_vm: DynamicVertexMap,
    ) -> Result<LocalDynamic, Error> {
        let fid = src.fid();
        let mut vertex_data: HashMap<u64, Attrs> = HashMap::new();
        let mut adj_out: Adjacency = HashMap::new();
        let mut adj_in: Adjacency = HashMap::new();
        let mut outbound: Vec<Vec<(u64, u64, Attrs)>> = vec![Vec::new(); src.fnum()];

        for v_label in 0..src.vertex_label_num() as i32 {
            let table = src.vertex_table(v_label);
            for offset in src.inner_vertices(v_label) {
                let oid = src.get_oid(v_label, offset);
                let gid = dst_vm
                    .get_gid(&Oid::Int(oid))
                    .expect("converted vertex map covers every source vertex");
                let mut data = Attrs::new();
                for (col_id, column) in table.iter().enumerate() {
                    let key = &src.vertex_property_schema(v_label, col_id as i32)?.name;
                    if data.contains_key(key) {
                        return Err(Error::new(
                            ErrorKind::IllegalState,
                            format!("Duplicated key {}", key),
                        ));
                    }
                    data.insert(key.clone(), columns::column_value(column, offset)?);
                }
                vertex_data.insert(gid, data);
            }
        }

        for v_label in 0..src.vertex_label_num() as i32 {
            for offset in src.inner_vertices(v_label) {
                let u_oid = src.get_oid(v_label, offset);
                let u_gid = dst_vm
                    .get_gid(&Oid::Int(u_oid))
                    .expect("converted vertex map covers every source vertex");
                let mut existed_dsts = HashSet::new();
                for e_label in 0..src.edge_label_num() as i32 {
                    let table = src.edge_table(e_label);
                    let label_schema = &src.schema().edge_labels[e_label as usize];
                    for &(v_src_gid, row) in src.out_edges(e_label, v_label, offset) {
                        let v_oid = src.vertex_map().get_oid(v_src_gid)?;
                        let v_gid = dst_vm
                            .get_gid(&Oid::Int(v_oid))
                            .expect("converted vertex map covers every source vertex");
                        // Parallel edges across labels cannot be expressed in
                        // the dynamic representation.
                        if !existed_dsts.insert(v_gid) {
                            return Err(Error::new(
                                ErrorKind::IllegalState,
                                format!("Duplicated edge: {} -> {}", u_oid, v_oid),
                            ));
                        }
                        let mut data = Attrs::new();
                        for (col_id, column) in table.columns.iter().enumerate() {
                            let key = &label_schema.properties[col_id].name;
                            if data.contains_key(key) {
                                return Err(Error::new(
                                    ErrorKind::IllegalState,
                                    format!("Duplicated key {}", key),
                                ));
                            }
                            data.insert(key.clone(), columns::column_value(column, row)?);
                        }
                        adj_out.entry(u_gid).or_default().insert(v_gid, data.clone());
                        if src.directed() {
                            let v_fid = DynamicVertexMap::gid_fid(v_gid);
                            if v_fid == fid {
                                adj_in.entry(v_gid).or_default().insert(u_gid, data);
                            } else {
                                outbound[v_fid].push((u_gid, v_gid, data));
                            }
                        }
                        // Undirected columnar adjacency already lists both
                        // endpoints, so nothing to mirror here.
                    }
                }
            }
        }

        Ok(LocalDynamic {
            vm: dst_vm,
            vertex_data,
            adj_out,
            adj_in,
            outbound,
        })
    }
}

/// Converts a dynamic fragment into a columnar fragment.
#[derive(Debug)]
pub struct DynamicToArrowConverter<'a> {
    comm: &'a CommSpec,
    client: &'a Client,
}

impl<'a> DynamicToArrowConverter<'a> {
    /// Creates a converter.
    pub fn new(comm: &'a CommSpec, client: &'a Client) -> DynamicToArrowConverter<'a> {
        DynamicToArrowConverter { comm, client }
    }

    /// Runs the conversion, registering the new fragment in the store.
    ///
    /// The resulting graph has a single vertex label `_V` and a single edge
    /// label `_E`. The property sets are the union of the attribute keys
    /// observed on any worker; conflicting value types fail the conversion
    /// unless both are numeric, which promotes to double.
    pub fn convert(
        &self,
        src: &DynamicFragment,
        generate_eid: bool,
    ) -> Result<(ObjectId, Arc<PropertyFragment>), Error> {
        let fid = src.fid();

        // Vertices must carry integer oids to become columnar. The check is
        // per-shard data, so agree on the outcome first.
        let vertices = src.inner_vertices();
        let oid_check = vertices
            .iter()
            .find(|(_, oid)| oid.as_i64().is_none())
            .map_or(Ok(()), |(_, oid)| {
                Err(Error::new(
                    ErrorKind::DataType,
                    format!("vertex id {} is not an integer", oid),
                ))
            });
        self.comm.uniform_result(oid_check)?;

        // The edge rows of a fragment are the edges incident to its inner
        // vertices; an edge with both endpoints local appears once.
        let mut edge_rows: Vec<(u64, u64, Attrs)> = Vec::new();
        for (u_gid, _) in &vertices {
            for (v_gid, attrs) in src.out_edges(*u_gid) {
                let v_local = DynamicVertexMap::gid_fid(v_gid) == fid;
                if src.directed() || *u_gid <= v_gid || !v_local {
                    edge_rows.push((*u_gid, v_gid, attrs));
                }
            }
        }

        // Agree on the property schemas across workers.
        let v_props = self.gather_schema(
            vertices
                .iter()
                .filter_map(|(gid, _)| src.vertex_attrs(*gid)),
        )?;
        let e_props = self.gather_schema(edge_rows.iter().map(|(_, _, attrs)| attrs.clone()))?;

        // Everything that remains is local; the caller's fragment-group
        // construction is the next collective, so failures must be uniform.
        let built = self.build_fragment(src, generate_eid, &vertices, &edge_rows, &v_props, &e_props);
        self.comm.uniform_result(built)
    }

    fn build_fragment(
        &self,
        src: &DynamicFragment,
        generate_eid: bool,
        vertices: &[(u64, Oid)],
        edge_rows: &[(u64, u64, Attrs)],
        v_props: &[(String, arrow_schema::DataType)],
        e_props: &[(String, arrow_schema::DataType)],
    ) -> Result<(ObjectId, Arc<PropertyFragment>), Error> {
        let fid = src.fid();
        let fnum = src.fnum();

        // Rebuild the vertex map: every worker walks every fragment.
        let mut oids: Vec<Vec<Vec<i64>>> = vec![vec![Vec::new()]; fnum];
        src.with_vm(|vm| {
            for f in 0..fnum {
                for (_, oid) in vm.iter_fragment(f) {
                    if let Some(i) = oid.as_i64() {
                        oids[f][0].push(i);
                    }
                }
            }
        });
        let vm = PropertyVertexMap::build(fnum, 1, oids).register(self.client)?;
        let to_new_gid = |old_gid: u64| -> u64 {
            src.with_vm(|dvm| {
                let oid = dvm.get_oid(old_gid).cloned().expect("edge endpoints resolve");
                let i = oid.as_i64().expect("integer oids checked above");
                vm.global_gid(0, i).expect("vertex map covers endpoints")
            })
        };

        // Vertex columns, rows in offset order.
        let mut v_columns = Vec::new();
        let mut v_schema = Vec::new();
        for (name, data_type) in v_props {
            let values: Vec<Value> = vertices
                .iter()
                .map(|(gid, _)| {
                    src.vertex_attrs(*gid)
                        .and_then(|a| a.get(name).cloned())
                        .unwrap_or(Value::Null)
                })
                .map(|v| coerce(v, data_type))
                .collect();
            v_columns.push(columns::build_column(data_type, &values)?);
            v_schema.push(PropertySchema::new(name, data_type)?);
        }

        // Edge columns and adjacency.
        let mut e_values: Vec<Vec<Value>> = vec![Vec::new(); e_props.len()];
        let mut out_adj: Vec<Vec<(u64, usize)>> = vec![Vec::new(); vm.inner_vertex_size(fid, 0)];
        let mut eid_column = Vec::new();
        for (row, (u_gid, v_gid, attrs)) in edge_rows.iter().enumerate() {
            let u_new = to_new_gid(*u_gid);
            let v_new = to_new_gid(*v_gid);
            let u_offset = vm.id_parser().offset(u_new);
            out_adj[u_offset].push((v_new, row));
            if !src.directed() && DynamicVertexMap::gid_fid(*v_gid) == fid && u_gid != v_gid {
                out_adj[vm.id_parser().offset(v_new)].push((u_new, row));
            }
            for (col, (name, data_type)) in e_props.iter().enumerate() {
                let value = attrs.get(name).cloned().unwrap_or(Value::Null);
                e_values[col].push(coerce(value, data_type));
            }
            if generate_eid {
                eid_column.push(Value::from(((fid as i64) << 48) | row as i64));
            }
        }

        let mut e_columns = Vec::new();
        let mut e_schema = Vec::new();
        for (col, (name, data_type)) in e_props.iter().enumerate() {
            e_columns.push(columns::build_column(data_type, &e_values[col])?);
            e_schema.push(PropertySchema::new(name, data_type)?);
        }
        if generate_eid {
            e_columns.push(columns::build_column(
                &arrow_schema::DataType::Int64,
                &eid_column,
            )?);
            e_schema.push(PropertySchema::new("eid", &arrow_schema::DataType::Int64)?);
        }

        let schema = PropertyGraphSchema {
            vertex_labels: vec![LabelSchema {
                label: "_V".to_string(),
                properties: v_schema,
            }],
            edge_labels: vec![LabelSchema {
                label: "_E".to_string(),
                properties: e_schema,
            }],
        };
        debug!(fid, edges = edge_rows.len(), "converted dynamic fragment to columnar");
        let frag = PropertyFragment::new(
            fid,
            fnum,
            src.directed(),
            generate_eid,
            schema,
            vm,
            vec![v_columns],
            vec![EdgeTable {
                columns: e_columns,
                out_adj: vec![out_adj],
            }],
        );
        frag.register(self.client)
    }

    /// Computes the cluster-wide union of attribute schemas, in sorted key
    /// order. A worker whose local scan failed fails the collective uniformly.
    fn gather_schema(
        &self,
        attrs: impl Iterator<Item = Attrs>,
    ) -> Result<Vec<(String, arrow_schema::DataType)>, Error> {
        let local: Result<BTreeMap<String, String>, Error> = attrs
            .into_iter()
            .try_fold(BTreeMap::new(), |mut acc, map| {
                for (key, value) in &map {
                    let data_type = columns::infer_type(value)?;
                    let name = columns::type_name(&data_type)?.to_string();
                    merge_type(&mut acc, key, &name)?;
                }
                Ok(acc)
            });
        let encoded = serde_json::to_vec(&local)
            .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))?;
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for part in self.comm.all_gather(encoded)? {
            let remote: Result<BTreeMap<String, String>, Error> =
                serde_json::from_slice(&part)
                    .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))?;
            for (key, name) in remote? {
                merge_type(&mut merged, &key, &name)?;
            }
        }
        merged
            .into_iter()
            .map(|(key, name)| Ok((key, columns::type_from_name(&name)?)))
            .collect()
    }
}

fn merge_type(schema: &mut BTreeMap<String, String>, key: &str, name: &str) -> Result<(), Error> {
    match schema.get(key) {
        None => {
            schema.insert(key.to_string(), name.to_string());
            Ok(())
        }
        Some(prev) if prev == name => Ok(()),
        Some(prev) if is_numeric(prev) && is_numeric(name) => {
            schema.insert(key.to_string(), "double".to_string());
            Ok(())
        }
        Some(prev) => Err(Error::new(
            ErrorKind::DataType,
            format!("property {} mixes types {} and {}", key, prev, name),
        )),
    }
}

fn is_numeric(name: &str) -> bool {
    matches!(name, "int64" | "double")
}

fn coerce(value: Value, data_type: &arrow_schema::DataType) -> Value {
    match (value, data_type) {
        (Value::Null, arrow_schema::DataType::Int64) => Value::from(0i64),
        (Value::Null, arrow_schema::DataType::Float64) => Value::from(0.0f64),
        (Value::Null, arrow_schema::DataType::Utf8) => Value::from(""),
        (Value::Number(n), arrow_schema::DataType::Float64) => Value::from(n.as_f64().unwrap_or(0.0)),
        (v, _) => v,
    }
}
