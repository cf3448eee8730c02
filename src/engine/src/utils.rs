// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Graph utilities and projectors, keyed by type signature.
//!
//! A type signature is a canonical string encoding of a fragment's
//! OID/VID/VDATA/EDATA tuple. Each signature maps to a code module exposing
//! the loader, converters, and projector for that concrete instantiation: the
//! engine's standard `int64_t`/`uint64_t` instantiation is compiled in, and
//! other signatures resolve through a versioned vtable in a registered
//! library. Registration is idempotent per signature.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use comm::CommSpec;
use graph::{
    build_column, infer_type, partition_for, ArrowProjectedFragment, ArrowToDynamicConverter,
    DynamicProjectedFragment, DynamicToArrowConverter, EdgeTable, LabelSchema, Oid,
    PropertyFragment, PropertyGraphSchema, PropertySchema, PropertyVertexMap,
};
use graph_types::{Error, ErrorKind, GraphDef, GraphType, ParamKey, Params, SchemaDef};
use store::{construct_fragment_group, Client, ObjectId};

use crate::wrapper::{
    property_graph_def, DynamicGraphWrapper, DynamicProjectedGraphWrapper, GraphWrapper,
    ProjectedGraphWrapper, PropertyGraphWrapper,
};

/// The plugin ABI understood by this engine.
pub const GRAPH_ABI_VERSION: u32 = 1;

/// The compiled-in property-graph instantiation.
pub const BUILTIN_PROPERTY_SIG: &str = "arrow_property<int64_t,uint64_t>";
/// The compiled-in columnar projection instantiation.
pub const BUILTIN_PROJECTED_SIG: &str = "arrow_projected<int64_t,uint64_t,double,double>";
/// The compiled-in dynamic projection instantiation.
pub const BUILTIN_DYNAMIC_PROJECTED_SIG: &str = "dynamic_projected<double,double>";
/// The library path that selects a compiled-in module.
pub const BUILTIN_LIB_PATH: &str = "builtin";

/// The vtable a graph-type library exports.
pub struct GraphModule {
    /// Loads a graph from loader parameters.
    pub load_graph:
        fn(&CommSpec, &Client, &str, &Params) -> Result<GraphWrapper, Error>,
    /// Adds labels to an existing fragment.
    pub add_labels:
        fn(ObjectId, &CommSpec, &Client, &str, &Params) -> Result<GraphWrapper, Error>,
    /// Converts a columnar graph to a dynamic graph.
    pub to_dynamic: fn(&CommSpec, &GraphWrapper, &str) -> Result<GraphWrapper, Error>,
    /// Converts a dynamic graph to a columnar graph.
    pub to_arrow: fn(&Client, &CommSpec, &GraphWrapper, &str) -> Result<GraphWrapper, Error>,
}

/// The vtable a projector library exports.
pub struct ProjectorModule {
    /// Projects a graph onto the simple shape.
    pub project: fn(&GraphWrapper, &str, &Params) -> Result<GraphWrapper, Error>,
}

static BUILTIN_GRAPH_MODULE: GraphModule = GraphModule {
    load_graph: builtin_load_graph,
    add_labels: builtin_add_labels,
    to_dynamic: builtin_to_dynamic,
    to_arrow: builtin_to_arrow,
};

static BUILTIN_PROJECTOR_MODULE: ProjectorModule = ProjectorModule {
    project: builtin_project,
};

enum ModuleHandle<M: 'static> {
    Builtin(&'static M),
    Loaded {
        _lib: libloading::Library,
        module: &'static M,
    },
}

impl<M> ModuleHandle<M> {
    fn get(&self) -> &M {
        match self {
            ModuleHandle::Builtin(m) => m,
            ModuleHandle::Loaded { module, .. } => module,
        }
    }
}

impl<M> fmt::Debug for ModuleHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModuleHandle::Builtin(_) => f.write_str("Builtin"),
            ModuleHandle::Loaded { .. } => f.write_str("Loaded"),
        }
    }
}

fn load_module<M>(lib_path: &str, module_symbol: &[u8]) -> Result<ModuleHandle<M>, Error> {
    // SAFETY: loading a graph-type library runs its initializers; the
    // deployment only installs libraries built against this engine.
    let lib = unsafe { libloading::Library::new(lib_path) }.map_err(|e| {
        Error::new(
            ErrorKind::LibraryLoad,
            format!("failed to load {}: {}", lib_path, e),
        )
    })?;
    let module = unsafe {
        let abi: libloading::Symbol<unsafe extern "C" fn() -> u32> =
            lib.get(b"engine_graph_abi_version").map_err(|e| {
                Error::new(
                    ErrorKind::LibraryLoad,
                    format!("{} exports no ABI version: {}", lib_path, e),
                )
            })?;
        let version = abi();
        if version != GRAPH_ABI_VERSION {
            return Err(Error::new(
                ErrorKind::LibraryLoad,
                format!(
                    "ABI mismatch for {}: expected {} got {}",
                    lib_path, GRAPH_ABI_VERSION, version
                ),
            ));
        }
        let entry: libloading::Symbol<unsafe extern "C" fn() -> *const M> =
            lib.get(module_symbol).map_err(|e| {
                Error::new(
                    ErrorKind::LibraryLoad,
                    format!("{} exports no module entry: {}", lib_path, e),
                )
            })?;
        &*entry()
    };
    Ok(ModuleHandle::Loaded { _lib: lib, module })
}

/// The loader/converter module for one property-graph type signature.
#[derive(Debug)]
pub struct GraphUtils {
    type_sig: String,
    module: ModuleHandle<GraphModule>,
}

impl GraphUtils {
    /// Resolves the module for a signature.
    pub fn init(type_sig: &str, lib_path: &str) -> Result<GraphUtils, Error> {
        let module = if lib_path == BUILTIN_LIB_PATH {
            ModuleHandle::Builtin(&BUILTIN_GRAPH_MODULE)
        } else {
            load_module(lib_path, b"engine_graph_module_v1")?
        };
        Ok(GraphUtils {
            type_sig: type_sig.to_string(),
            module,
        })
    }

    /// The signature this module serves.
    pub fn type_sig(&self) -> &str {
        &self.type_sig
    }

    /// Loads a graph from loader parameters.
    pub fn load_graph(
        &self,
        comm: &CommSpec,
        client: &Client,
        graph_name: &str,
        params: &Params,
    ) -> Result<GraphWrapper, Error> {
        (self.module.get().load_graph)(comm, client, graph_name, params)
    }

    /// Adds labels to an existing fragment.
    pub fn add_labels_to_graph(
        &self,
        src_frag_id: ObjectId,
        comm: &CommSpec,
        client: &Client,
        graph_name: &str,
        params: &Params,
    ) -> Result<GraphWrapper, Error> {
        (self.module.get().add_labels)(src_frag_id, comm, client, graph_name, params)
    }

    /// Converts a columnar graph to a dynamic graph.
    pub fn to_dynamic_fragment(
        &self,
        comm: &CommSpec,
        src: &GraphWrapper,
        dst_graph_name: &str,
    ) -> Result<GraphWrapper, Error> {
        (self.module.get().to_dynamic)(comm, src, dst_graph_name)
    }

    /// Converts a dynamic graph to a columnar graph.
    pub fn to_arrow_fragment(
        &self,
        client: &Client,
        comm: &CommSpec,
        src: &GraphWrapper,
        dst_graph_name: &str,
    ) -> Result<GraphWrapper, Error> {
        (self.module.get().to_arrow)(client, comm, src, dst_graph_name)
    }
}

/// The projector module for one simple-graph type signature.
#[derive(Debug)]
pub struct Projector {
    type_sig: String,
    module: ModuleHandle<ProjectorModule>,
}

impl Projector {
    /// Resolves the module for a signature.
    pub fn init(type_sig: &str, lib_path: &str) -> Result<Projector, Error> {
        let module = if lib_path == BUILTIN_LIB_PATH {
            ModuleHandle::Builtin(&BUILTIN_PROJECTOR_MODULE)
        } else {
            load_module(lib_path, b"engine_projector_module_v1")?
        };
        Ok(Projector {
            type_sig: type_sig.to_string(),
            module,
        })
    }

    /// The signature this module serves.
    pub fn type_sig(&self) -> &str {
        &self.type_sig
    }

    /// Projects a graph onto the simple shape.
    pub fn project(
        &self,
        src: &GraphWrapper,
        dst_id: &str,
        params: &Params,
    ) -> Result<GraphWrapper, Error> {
        (self.module.get().project)(src, dst_id, params)
    }
}

struct ParsedGraph {
    schema: PropertyGraphSchema,
    // (label id, oid, attrs) in input order.
    nodes: Vec<(usize, i64, serde_json::Map<String, Value>)>,
    // (edge label id, src oid, dst oid, attrs) in input order.
    edges: Vec<(usize, i64, i64, serde_json::Map<String, Value>)>,
}

fn parse_attrs(rest: Option<&str>) -> Result<serde_json::Map<String, Value>, Error> {
    match rest.map(str::trim) {
        None | Some("") => Ok(serde_json::Map::new()),
        Some(json) => match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::new(
                ErrorKind::InvalidValue,
                format!("properties must be a JSON object: {}", other),
            )),
        },
    }
}

fn parse_oid(token: &str) -> Result<i64, Error> {
    token.parse().map_err(|_| {
        Error::new(
            ErrorKind::InvalidValue,
            format!("vertex id is not an integer: {}", token),
        )
    })
}

/// Parses node and edge lines against an optional explicit schema. Absent a
/// schema, labels appear in input order and property types are inferred from
/// each label's first record.
fn parse_graph_input(params: &Params) -> Result<ParsedGraph, Error> {
    let explicit_schema = match params.get_opt::<String>(ParamKey::SchemaPath)? {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Some(PropertyGraphSchema::from_json_str(&raw)?)
        }
        None => None,
    };
    let node_lines = params.get_opt::<Vec<String>>(ParamKey::Nodes)?.unwrap_or_default();
    let edge_lines = params.get_opt::<Vec<String>>(ParamKey::Edges)?.unwrap_or_default();

    let mut schema = explicit_schema.clone().unwrap_or_default();
    let fixed = explicit_schema.is_some();

    let mut nodes = Vec::new();
    for line in &node_lines {
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let (label, oid) = match (parts.next(), parts.next()) {
            (Some(label), Some(oid)) if !label.is_empty() => (label, oid),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("node line needs a label and an id: {}", line),
                ));
            }
        };
        let attrs = parse_attrs(parts.next())?;
        let label_id = match schema.vertex_label_id(label) {
            Some(id) => id as usize,
            None if fixed => {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("unknown vertex label: {}", label),
                ));
            }
            None => {
                schema.vertex_labels.push(LabelSchema {
                    label: label.to_string(),
                    properties: infer_properties(&attrs)?,
                });
                schema.vertex_labels.len() - 1
            }
        };
        nodes.push((label_id, parse_oid(oid)?, attrs));
    }

    let mut edges = Vec::new();
    for line in &edge_lines {
        let mut parts = line.trim().splitn(4, char::is_whitespace);
        let (label, src, dst) = match (parts.next(), parts.next(), parts.next()) {
            (Some(label), Some(src), Some(dst)) if !label.is_empty() => (label, src, dst),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("edge line needs a label and two endpoints: {}", line),
                ));
            }
        };
        let attrs = parse_attrs(parts.next())?;
        let label_id = match schema.edge_label_id(label) {
            Some(id) => id as usize,
            None if fixed => {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    format!("unknown edge label: {}", label),
                ));
            }
            None => {
                schema.edge_labels.push(LabelSchema {
                    label: label.to_string(),
                    properties: infer_properties(&attrs)?,
                });
                schema.edge_labels.len() - 1
            }
        };
        edges.push((label_id, parse_oid(src)?, parse_oid(dst)?, attrs));
    }

    Ok(ParsedGraph {
        schema,
        nodes,
        edges,
    })
}

fn infer_properties(
    attrs: &serde_json::Map<String, Value>,
) -> Result<Vec<PropertySchema>, Error> {
    attrs
        .iter()
        .map(|(name, value)| PropertySchema::new(name, &infer_type(value)?))
        .collect()
}

fn property_values(
    props: &[PropertySchema],
    rows: &[&serde_json::Map<String, Value>],
) -> Result<Vec<(String, arrow_array::ArrayRef)>, Error> {
    let mut out = Vec::new();
    for prop in props {
        let data_type = prop.arrow_type()?;
        let values: Vec<Value> = rows
            .iter()
            .map(|attrs| match attrs.get(&prop.name) {
                Some(Value::Number(n)) if data_type == arrow_schema::DataType::Float64 => {
                    Value::from(n.as_f64().unwrap_or(0.0))
                }
                Some(v) => v.clone(),
                None => match data_type {
                    arrow_schema::DataType::Float64 => Value::from(0.0f64),
                    arrow_schema::DataType::Utf8 => Value::from(""),
                    _ => Value::from(0i64),
                },
            })
            .collect();
        out.push((prop.name.clone(), build_column(&data_type, &values)?));
    }
    Ok(out)
}

/// The compiled-in loader: builds one worker's shard from inline node and
/// edge lines, registers the fragment, and assembles the fragment group.
fn builtin_load_graph(
    comm: &CommSpec,
    client: &Client,
    graph_name: &str,
    params: &Params,
) -> Result<GraphWrapper, Error> {
    // Local parsing happens before any collective so that one worker's bad
    // input surfaces the same error everywhere instead of wedging a fence.
    let parsed = comm.uniform_result(parse_graph_input(params))?;
    let directed = params.get_opt::<bool>(ParamKey::Directed)?.unwrap_or(true);
    let generate_eid = params.get_opt::<bool>(ParamKey::GenerateEid)?.unwrap_or(false);

    let fid = comm.fid();
    let fnum = comm.fnum();
    let label_num = parsed.schema.vertex_labels.len().max(1);
    let mut schema = parsed.schema;
    if schema.vertex_labels.is_empty() {
        schema.vertex_labels.push(LabelSchema {
            label: "_V".to_string(),
            properties: Vec::new(),
        });
    }

    // The vertex map is global: every worker walks the full node list.
    let mut oids: Vec<Vec<Vec<i64>>> = vec![vec![Vec::new(); label_num]; fnum];
    let mut label_of: HashMap<i64, usize> = HashMap::new();
    for (label_id, oid, _) in &parsed.nodes {
        if label_of.insert(*oid, *label_id).is_some() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("Duplicated oid {}", oid),
            ));
        }
        let owner = partition_for(&Oid::Int(*oid), fnum);
        oids[owner][*label_id].push(*oid);
    }
    let vm = PropertyVertexMap::build(fnum, label_num, oids).register(client)?;

    // Local vertex tables, rows in offset order.
    let mut vertex_tables = Vec::new();
    for (label_id, label_schema) in schema.vertex_labels.iter().enumerate() {
        let rows: Vec<&serde_json::Map<String, Value>> = parsed
            .nodes
            .iter()
            .filter(|(l, oid, _)| {
                *l == label_id && partition_for(&Oid::Int(*oid), fnum) == fid
            })
            .map(|(_, _, attrs)| attrs)
            .collect();
        let columns = property_values(&label_schema.properties, &rows)?;
        vertex_tables.push(columns.into_iter().map(|(_, col)| col).collect());
    }

    // Local edge tables: the rows of a fragment are the edges incident to its
    // inner vertices; an edge with both endpoints local appears once.
    let mut edge_tables = Vec::new();
    let mut generated_schema = schema.clone();
    for (e_label, label_schema) in schema.edge_labels.iter().enumerate() {
        let mut rows = Vec::new();
        for (l, src, dst, attrs) in &parsed.edges {
            if *l != e_label {
                continue;
            }
            let src_owner = partition_for(&Oid::Int(*src), fnum);
            let dst_owner = partition_for(&Oid::Int(*dst), fnum);
            let keep = src_owner == fid || (!directed && dst_owner == fid && src_owner != fid);
            if keep {
                rows.push((*src, *dst, attrs));
            }
        }
        let attr_rows: Vec<&serde_json::Map<String, Value>> =
            rows.iter().map(|(_, _, attrs)| *attrs).collect();
        let mut columns: Vec<arrow_array::ArrayRef> =
            property_values(&label_schema.properties, &attr_rows)?
                .into_iter()
                .map(|(_, col)| col)
                .collect();
        if generate_eid {
            let eids: Vec<Value> = (0..rows.len())
                .map(|row| Value::from(((fid as i64) << 48) | row as i64))
                .collect();
            columns.push(build_column(&arrow_schema::DataType::Int64, &eids)?);
            generated_schema.edge_labels[e_label]
                .properties
                .push(PropertySchema::new("eid", &arrow_schema::DataType::Int64)?);
        }

        let mut out_adj: Vec<Vec<Vec<(u64, usize)>>> = (0..label_num)
            .map(|label| vec![Vec::new(); vm.inner_vertex_size(fid, label as i32)])
            .collect();
        for (row, (src, dst, _)) in rows.iter().enumerate() {
            let src_label = *label_of.get(src).ok_or_else(|| unknown_vertex(*src))?;
            let dst_label = *label_of.get(dst).ok_or_else(|| unknown_vertex(*dst))?;
            let src_gid = vm
                .global_gid(src_label as i32, *src)
                .ok_or_else(|| unknown_vertex(*src))?;
            let dst_gid = vm
                .global_gid(dst_label as i32, *dst)
                .ok_or_else(|| unknown_vertex(*dst))?;
            if vm.id_parser().fid(src_gid) == fid {
                out_adj[src_label][vm.id_parser().offset(src_gid)].push((dst_gid, row));
            }
            if !directed && vm.id_parser().fid(dst_gid) == fid && src != dst {
                out_adj[dst_label][vm.id_parser().offset(dst_gid)].push((src_gid, row));
            }
        }
        edge_tables.push(EdgeTable { columns, out_adj });
    }

    let frag = PropertyFragment::new(
        fid,
        fnum,
        directed,
        generate_eid,
        generated_schema,
        vm,
        vertex_tables,
        edge_tables,
    );
    let (frag_id, frag) = frag.register(client)?;
    let group_id = construct_fragment_group(client, comm, frag_id)?;
    let mut graph_def = property_graph_def(graph_name, &frag, group_id);
    graph_def.schema_path = params.get_opt::<String>(ParamKey::SchemaPath)?;
    Ok(GraphWrapper::Property(PropertyGraphWrapper {
        graph_def,
        frag,
        frag_id,
    }))
}

fn unknown_vertex(oid: i64) -> Error {
    Error::new(
        ErrorKind::InvalidValue,
        format!("edge endpoint {} is not a loaded vertex", oid),
    )
}

/// The compiled-in label adder: merges new labels into an existing fragment
/// under a fresh vertex map.
fn builtin_add_labels(
    src_frag_id: ObjectId,
    comm: &CommSpec,
    client: &Client,
    graph_name: &str,
    params: &Params,
) -> Result<GraphWrapper, Error> {
    let old = client.get_payload_as::<PropertyFragment>(src_frag_id)?;
    let parsed = comm.uniform_result(parse_graph_input(params))?;
    for label in &parsed.schema.vertex_labels {
        if old.schema().vertex_label_id(&label.label).is_some() {
            return Err(Error::new(
                ErrorKind::IllegalState,
                format!("vertex label {} already exists", label.label),
            ));
        }
    }
    for label in &parsed.schema.edge_labels {
        if old.schema().edge_label_id(&label.label).is_some() {
            return Err(Error::new(
                ErrorKind::IllegalState,
                format!("edge label {} already exists", label.label),
            ));
        }
    }

    let fid = comm.fid();
    let fnum = comm.fnum();
    let old_label_num = old.vertex_label_num();
    let new_label_num = old_label_num + parsed.schema.vertex_labels.len();

    // Previous labels keep their offsets; new labels extend the map.
    let mut oids: Vec<Vec<Vec<i64>>> = (0..fnum)
        .map(|f| {
            (0..old_label_num)
                .map(|label| old.vertex_map().oids(f, label as i32).to_vec())
                .chain((old_label_num..new_label_num).map(|_| Vec::new()))
                .collect()
        })
        .collect();
    let mut label_of: HashMap<i64, usize> = HashMap::new();
    for f in 0..fnum {
        for label in 0..old_label_num {
            for &oid in old.vertex_map().oids(f, label as i32) {
                label_of.insert(oid, label);
            }
        }
    }
    for (label_id, oid, _) in &parsed.nodes {
        let label_id = old_label_num + label_id;
        if label_of.insert(*oid, label_id).is_some() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("Duplicated oid {}", oid),
            ));
        }
        oids[partition_for(&Oid::Int(*oid), fnum)][label_id].push(*oid);
    }
    let vm = PropertyVertexMap::build(fnum, new_label_num, oids).register(client)?;

    let mut schema = old.schema().clone();
    let mut vertex_tables: Vec<Vec<arrow_array::ArrayRef>> = (0..old_label_num)
        .map(|label| old.vertex_table(label as i32).to_vec())
        .collect();
    for (offset, label_schema) in parsed.schema.vertex_labels.iter().enumerate() {
        let label_id = old_label_num + offset;
        let rows: Vec<&serde_json::Map<String, Value>> = parsed
            .nodes
            .iter()
            .filter(|(l, oid, _)| {
                old_label_num + *l == label_id && partition_for(&Oid::Int(*oid), fnum) == fid
            })
            .map(|(_, _, attrs)| attrs)
            .collect();
        let columns = property_values(&label_schema.properties, &rows)?;
        vertex_tables.push(columns.into_iter().map(|(_, col)| col).collect());
        schema.vertex_labels.push(label_schema.clone());
    }

    // Old edge tables span more vertex labels now; pad their adjacency.
    let mut edge_tables: Vec<EdgeTable> = (0..old.edge_label_num())
        .map(|e_label| {
            let table = old.edge_table(e_label as i32);
            let mut out_adj = table.out_adj.clone();
            for label in old_label_num..new_label_num {
                out_adj.push(vec![Vec::new(); vm.inner_vertex_size(fid, label as i32)]);
            }
            EdgeTable {
                columns: table.columns.clone(),
                out_adj,
            }
        })
        .collect();

    let directed = old.directed();
    for (e_offset, label_schema) in parsed.schema.edge_labels.iter().enumerate() {
        let mut rows = Vec::new();
        for (l, src, dst, attrs) in &parsed.edges {
            if *l != e_offset {
                continue;
            }
            let src_owner = partition_for(&Oid::Int(*src), fnum);
            let dst_owner = partition_for(&Oid::Int(*dst), fnum);
            if src_owner == fid || (!directed && dst_owner == fid && src_owner != fid) {
                rows.push((*src, *dst, attrs));
            }
        }
        let attr_rows: Vec<&serde_json::Map<String, Value>> =
            rows.iter().map(|(_, _, attrs)| *attrs).collect();
        let columns: Vec<arrow_array::ArrayRef> =
            property_values(&label_schema.properties, &attr_rows)?
                .into_iter()
                .map(|(_, col)| col)
                .collect();
        let mut out_adj: Vec<Vec<Vec<(u64, usize)>>> = (0..new_label_num)
            .map(|label| vec![Vec::new(); vm.inner_vertex_size(fid, label as i32)])
            .collect();
        for (row, (src, dst, _)) in rows.iter().enumerate() {
            let src_label = *label_of.get(src).ok_or_else(|| unknown_vertex(*src))?;
            let dst_label = *label_of.get(dst).ok_or_else(|| unknown_vertex(*dst))?;
            let src_gid = vm
                .global_gid(src_label as i32, *src)
                .ok_or_else(|| unknown_vertex(*src))?;
            let dst_gid = vm
                .global_gid(dst_label as i32, *dst)
                .ok_or_else(|| unknown_vertex(*dst))?;
            if vm.id_parser().fid(src_gid) == fid {
                out_adj[src_label][vm.id_parser().offset(src_gid)].push((dst_gid, row));
            }
            if !directed && vm.id_parser().fid(dst_gid) == fid && src != dst {
                out_adj[dst_label][vm.id_parser().offset(dst_gid)].push((src_gid, row));
            }
        }
        edge_tables.push(EdgeTable { columns, out_adj });
        schema.edge_labels.push(label_schema.clone());
    }

    let frag = PropertyFragment::new(
        fid,
        fnum,
        directed,
        old.generate_eid(),
        schema,
        vm,
        vertex_tables,
        edge_tables,
    );
    let (frag_id, frag) = frag.register(client)?;
    let group_id = construct_fragment_group(client, comm, frag_id)?;
    let graph_def = property_graph_def(graph_name, &frag, group_id);
    Ok(GraphWrapper::Property(PropertyGraphWrapper {
        graph_def,
        frag,
        frag_id,
    }))
}

fn builtin_to_dynamic(
    comm: &CommSpec,
    src: &GraphWrapper,
    dst_graph_name: &str,
) -> Result<GraphWrapper, Error> {
    let w = src.as_property("convertGraph")?;
    let converter = ArrowToDynamicConverter::new(comm);
    let frag = converter.convert(&w.frag)?;
    let graph_def = crate::wrapper::dynamic_graph_def(dst_graph_name, frag.directed());
    Ok(GraphWrapper::Dynamic(DynamicGraphWrapper {
        graph_def,
        frag: Arc::new(frag),
    }))
}

fn builtin_to_arrow(
    client: &Client,
    comm: &CommSpec,
    src: &GraphWrapper,
    dst_graph_name: &str,
) -> Result<GraphWrapper, Error> {
    let frag = src.dynamic_fragment().map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            "only DynamicFragment converts to ArrowFragment",
        )
    })?;
    let converter = DynamicToArrowConverter::new(comm, client);
    let (frag_id, frag) = converter.convert(frag, false)?;
    let group_id = construct_fragment_group(client, comm, frag_id)?;
    let graph_def = property_graph_def(dst_graph_name, &frag, group_id);
    Ok(GraphWrapper::Property(PropertyGraphWrapper {
        graph_def,
        frag,
        frag_id,
    }))
}

/// The compiled-in projector.
fn builtin_project(
    src: &GraphWrapper,
    dst_id: &str,
    params: &Params,
) -> Result<GraphWrapper, Error> {
    match src {
        GraphWrapper::Property(w) => {
            let v_prop_key = params.get_opt::<String>(ParamKey::VPropKey)?;
            let e_prop_key = params.get_opt::<String>(ParamKey::EPropKey)?;
            if w.frag.schema().edge_labels.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidValue,
                    "graph has no edge labels to project",
                ));
            }
            let v_prop = match &v_prop_key {
                Some(name) => Some(w.frag.schema().vertex_property_id(0, name).ok_or_else(
                    || {
                        Error::new(
                            ErrorKind::InvalidValue,
                            format!("Invalid property name: {}", name),
                        )
                    },
                )?),
                None => None,
            };
            let e_prop = match &e_prop_key {
                Some(name) => {
                    let props = &w.frag.schema().edge_labels[0].properties;
                    Some(
                        props
                            .iter()
                            .position(|p| &p.name == name)
                            .ok_or_else(|| {
                                Error::new(
                                    ErrorKind::InvalidValue,
                                    format!("Invalid property name: {}", name),
                                )
                            })? as i32,
                    )
                }
                None => None,
            };
            let frag = ArrowProjectedFragment::new(Arc::clone(&w.frag), 0, v_prop, 0, e_prop)?;
            let vdata_type = prop_type_name(&w.frag, 0, v_prop)?;
            let edata_type = match e_prop {
                Some(prop) => w.frag.schema().edge_labels[0].properties[prop as usize]
                    .data_type
                    .clone(),
                None => "grape::EmptyType".to_string(),
            };
            let graph_def = GraphDef {
                key: dst_id.to_string(),
                graph_type: GraphType::ArrowProjected,
                directed: w.graph_def.directed,
                vineyard_id: -1,
                schema_def: SchemaDef {
                    oid_type: "int64_t".to_string(),
                    vid_type: "uint64_t".to_string(),
                    vdata_type,
                    edata_type,
                    property_schema_json: "{}".to_string(),
                },
                schema_path: None,
                generate_eid: w.graph_def.generate_eid,
            };
            Ok(GraphWrapper::Projected(ProjectedGraphWrapper {
                graph_def,
                frag: Arc::new(frag),
            }))
        }
        GraphWrapper::Dynamic(w) => {
            let v_prop = params.get_opt::<String>(ParamKey::VPropKey)?;
            let e_prop = params.get_opt::<String>(ParamKey::EPropKey)?;
            let frag = DynamicProjectedFragment::new(Arc::clone(&w.frag), v_prop, e_prop);
            let graph_def = GraphDef {
                key: dst_id.to_string(),
                graph_type: GraphType::DynamicProjected,
                directed: w.graph_def.directed,
                vineyard_id: -1,
                schema_def: SchemaDef {
                    oid_type: "dynamic::Oid".to_string(),
                    vid_type: "uint64_t".to_string(),
                    vdata_type: "dynamic::Value".to_string(),
                    edata_type: "dynamic::Value".to_string(),
                    property_schema_json: "{}".to_string(),
                },
                schema_path: None,
                generate_eid: false,
            };
            Ok(GraphWrapper::DynamicProjected(DynamicProjectedGraphWrapper {
                graph_def,
                frag: Arc::new(frag),
            }))
        }
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            "projectToSimple requires a property or dynamic graph",
        )),
    }
}

fn prop_type_name(
    frag: &PropertyFragment,
    label: i32,
    prop: Option<i32>,
) -> Result<String, Error> {
    match prop {
        Some(prop) => Ok(frag.vertex_property_schema(label, prop)?.data_type.clone()),
        None => Ok("grape::EmptyType".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_graph_library_fails_with_library_load() {
        let err = GraphUtils::init("sig", "/nonexistent/libgraph.so").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
        let err = Projector::init("sig", "/nonexistent/libgraph.so").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    }

    #[test]
    fn test_builtin_modules_resolve() {
        assert!(GraphUtils::init(BUILTIN_PROPERTY_SIG, BUILTIN_LIB_PATH).is_ok());
        assert!(Projector::init(BUILTIN_PROJECTED_SIG, BUILTIN_LIB_PATH).is_ok());
    }
}
