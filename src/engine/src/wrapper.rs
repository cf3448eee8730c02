// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The fragment wrapper hierarchy.
//!
//! A wrapper pairs a [`GraphDef`] with a concrete fragment and declares which
//! operations its variant supports; operations that are invalid for a variant
//! return `InvalidOperation` rather than panic. The wrapper's declared graph
//! type always equals its graph def's type.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::ArrayRef;

use comm::CommSpec;
use graph::{
    gather_archives, parse_view_type, ArrowProjectedFragment, DynamicFragment,
    DynamicFragmentView, DynamicProjectedFragment, FragmentHandle, PropertyFragment,
    PropertyGraphSchema, TransformUtils,
};
use graph_types::{
    Archive, ContextType, Error, ErrorKind, GraphDef, GraphType, LabeledSelector, Selector,
    SchemaDef, VertexRange,
};
use store::{construct_fragment_group, Client, ObjectId};

use crate::context::ContextWrapper;

/// Builds the graph def of a columnar graph from its fragment metadata.
pub(crate) fn property_graph_def(
    key: &str,
    frag: &PropertyFragment,
    group_id: ObjectId,
) -> GraphDef {
    GraphDef {
        key: key.to_string(),
        graph_type: GraphType::ArrowProperty,
        directed: frag.directed(),
        vineyard_id: group_id.as_i64(),
        schema_def: SchemaDef {
            oid_type: "int64_t".to_string(),
            vid_type: "uint64_t".to_string(),
            vdata_type: String::new(),
            edata_type: String::new(),
            property_schema_json: frag.schema().to_json_string(),
        },
        schema_path: None,
        generate_eid: frag.generate_eid(),
    }
}

/// Builds the graph def of a dynamic graph.
pub(crate) fn dynamic_graph_def(key: &str, directed: bool) -> GraphDef {
    GraphDef {
        key: key.to_string(),
        graph_type: GraphType::DynamicProperty,
        directed,
        // Dynamic graphs have no shared-store backing.
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
    }
}

/// A columnar labeled graph and its def.
#[derive(Debug)]
pub struct PropertyGraphWrapper {
    pub(crate) graph_def: GraphDef,
    pub(crate) frag: Arc<PropertyFragment>,
    /// This worker's fragment object in the store.
    pub(crate) frag_id: ObjectId,
}

/// A projected columnar graph and its def.
#[derive(Debug)]
pub struct ProjectedGraphWrapper {
    pub(crate) graph_def: GraphDef,
    pub(crate) frag: Arc<ArrowProjectedFragment>,
}

/// A dynamic graph and its def.
#[derive(Debug)]
pub struct DynamicGraphWrapper {
    pub(crate) graph_def: GraphDef,
    pub(crate) frag: Arc<DynamicFragment>,
}

/// A projected dynamic graph and its def.
#[derive(Debug)]
pub struct DynamicProjectedGraphWrapper {
    pub(crate) graph_def: GraphDef,
    pub(crate) frag: Arc<DynamicProjectedFragment>,
}

/// A read-only dynamic graph view and its def.
#[derive(Debug)]
pub struct DynamicViewWrapper {
    pub(crate) graph_def: GraphDef,
    pub(crate) frag: Arc<DynamicFragmentView>,
}

/// Polymorphic handle over the four fragment variants (plus views).
#[derive(Debug)]
pub enum GraphWrapper {
    /// Labeled columnar graph.
    Property(PropertyGraphWrapper),
    /// Projection of a columnar graph.
    Projected(ProjectedGraphWrapper),
    /// Mutable dynamic graph.
    Dynamic(DynamicGraphWrapper),
    /// Projection of a dynamic graph.
    DynamicProjected(DynamicProjectedGraphWrapper),
    /// Read-only view of a dynamic graph.
    DynamicView(DynamicViewWrapper),
}

impl GraphWrapper {
    /// Wraps a columnar fragment.
    pub fn property(
        key: &str,
        frag: Arc<PropertyFragment>,
        frag_id: ObjectId,
        group_id: ObjectId,
    ) -> GraphWrapper {
        let graph_def = property_graph_def(key, &frag, group_id);
        GraphWrapper::Property(PropertyGraphWrapper {
            graph_def,
            frag,
            frag_id,
        })
    }

    /// Wraps a dynamic fragment.
    pub fn dynamic(key: &str, frag: Arc<DynamicFragment>) -> GraphWrapper {
        let graph_def = dynamic_graph_def(key, frag.directed());
        GraphWrapper::Dynamic(DynamicGraphWrapper { graph_def, frag })
    }

    /// The metadata snapshot of this graph.
    pub fn graph_def(&self) -> &GraphDef {
        match self {
            GraphWrapper::Property(w) => &w.graph_def,
            GraphWrapper::Projected(w) => &w.graph_def,
            GraphWrapper::Dynamic(w) => &w.graph_def,
            GraphWrapper::DynamicProjected(w) => &w.graph_def,
            GraphWrapper::DynamicView(w) => &w.graph_def,
        }
    }

    /// The registry id of this graph.
    pub fn id(&self) -> &str {
        &self.graph_def().key
    }

    /// The concrete fragment handle.
    pub fn fragment(&self) -> FragmentHandle {
        match self {
            GraphWrapper::Property(w) => FragmentHandle::Property(Arc::clone(&w.frag)),
            GraphWrapper::Projected(w) => FragmentHandle::Projected(Arc::clone(&w.frag)),
            GraphWrapper::Dynamic(w) => FragmentHandle::Dynamic(Arc::clone(&w.frag)),
            GraphWrapper::DynamicProjected(w) => {
                FragmentHandle::DynamicProjected(Arc::clone(&w.frag))
            }
            GraphWrapper::DynamicView(w) => FragmentHandle::DynamicView(Arc::clone(&w.frag)),
        }
    }

    /// The dynamic fragment under this wrapper, if the variant has one.
    pub fn dynamic_fragment(&self) -> Result<&Arc<DynamicFragment>, Error> {
        match self {
            GraphWrapper::Dynamic(w) => Ok(&w.frag),
            _ => Err(Error::new(
                ErrorKind::InvalidValue,
                format!(
                    "Error graph type: {}, graph id: {}",
                    self.graph_def().graph_type,
                    self.id()
                ),
            )),
        }
    }

    /// The columnar wrapper fields, or `InvalidOperation` for other variants.
    pub(crate) fn as_property(&self, op: &str) -> Result<&PropertyGraphWrapper, Error> {
        match self {
            GraphWrapper::Property(w) => Ok(w),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("{} is only available for ArrowFragment", op),
            )),
        }
    }

    /// Materializes a duplicate of this graph.
    pub fn copy_graph(
        &self,
        comm: &CommSpec,
        client: &Client,
        dst_graph_name: &str,
        copy_type: &str,
    ) -> Result<GraphWrapper, Error> {
        match self {
            GraphWrapper::Property(w) => {
                // The fragment bytes are immutable and shared; the copy
                // reconstructs the fragment group under a fresh def.
                let group_id = construct_fragment_group(client, comm, w.frag_id)?;
                let mut graph_def = w.graph_def.clone();
                graph_def.key = dst_graph_name.to_string();
                graph_def.vineyard_id = group_id.as_i64();
                Ok(GraphWrapper::Property(PropertyGraphWrapper {
                    graph_def,
                    frag: Arc::clone(&w.frag),
                    frag_id: w.frag_id,
                }))
            }
            GraphWrapper::Dynamic(w) => {
                let dst = w.frag.copy(copy_type)?;
                let mut graph_def = w.graph_def.clone();
                graph_def.key = dst_graph_name.to_string();
                Ok(GraphWrapper::Dynamic(DynamicGraphWrapper {
                    graph_def,
                    frag: Arc::new(dst),
                }))
            }
            GraphWrapper::Projected(_) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "Can not copy ArrowProjectedFragment",
            )),
            GraphWrapper::DynamicProjected(_) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "Can not copy DynamicProjectedFragment",
            )),
            GraphWrapper::DynamicView(_) => Err(Error::new(
                ErrorKind::InvalidOperation,
                "Can not copy a graph view",
            )),
        }
    }

    /// Produces the directed counterpart of a dynamic graph.
    pub fn to_directed(&self, dst_graph_name: &str) -> Result<GraphWrapper, Error> {
        match self {
            GraphWrapper::Dynamic(w) => {
                let dst = w.frag.to_directed();
                let mut graph_def = w.graph_def.clone();
                graph_def.key = dst_graph_name.to_string();
                graph_def.directed = true;
                Ok(GraphWrapper::Dynamic(DynamicGraphWrapper {
                    graph_def,
                    frag: Arc::new(dst),
                }))
            }
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("Can not to directed {}", self.graph_def().graph_type),
            )),
        }
    }

    /// Produces the undirected counterpart of a dynamic graph.
    pub fn to_undirected(&self, dst_graph_name: &str) -> Result<GraphWrapper, Error> {
        match self {
            GraphWrapper::Dynamic(w) => {
                let dst = w.frag.to_undirected();
                let mut graph_def = w.graph_def.clone();
                graph_def.key = dst_graph_name.to_string();
                graph_def.directed = false;
                Ok(GraphWrapper::Dynamic(DynamicGraphWrapper {
                    graph_def,
                    frag: Arc::new(dst),
                }))
            }
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("Can not to undirected {}", self.graph_def().graph_type),
            )),
        }
    }

    /// Constructs a read-only view of a dynamic graph.
    pub fn create_graph_view(&self, view_id: &str, view_type: &str) -> Result<GraphWrapper, Error> {
        match self {
            GraphWrapper::Dynamic(w) => {
                let view_type = parse_view_type(view_type)?;
                let mut graph_def = w.graph_def.clone();
                graph_def.key = view_id.to_string();
                Ok(GraphWrapper::DynamicView(DynamicViewWrapper {
                    graph_def,
                    frag: Arc::new(DynamicFragmentView::new(Arc::clone(&w.frag), view_type)),
                }))
            }
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("Cannot generate a graph view over {}", self.graph_def().graph_type),
            )),
        }
    }

    /// Produces a columnar graph restricted to the selected labels and
    /// properties.
    pub fn project(
        &self,
        comm: &CommSpec,
        client: &Client,
        dst_graph_name: &str,
        vertices: &BTreeMap<i32, Vec<i32>>,
        edges: &BTreeMap<i32, Vec<i32>>,
    ) -> Result<GraphWrapper, Error> {
        let w = self.as_property("projectGraph")?;
        if vertices.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                "project selects no vertex labels",
            ));
        }
        let (new_frag_id, new_frag) = w.frag.project(client, vertices, edges)?;
        let group_id = construct_fragment_group(client, comm, new_frag_id)?;
        let mut graph_def = property_graph_def(dst_graph_name, &new_frag, group_id);
        graph_def.generate_eid = w.graph_def.generate_eid;
        Ok(GraphWrapper::Property(PropertyGraphWrapper {
            graph_def,
            frag: new_frag,
            frag_id: new_frag_id,
        }))
    }

    /// Appends context-derived columns as new vertex properties.
    ///
    /// Preconditions, any violation an `IllegalState`: the context variant is
    /// vertex-associated; the context's vertex map covers the same fragment
    /// count; the per-(fid, label) o2g and oid-array member objects of the
    /// context's vertex map are identical to this fragment's; every targeted
    /// label exists in this graph's schema.
    pub fn add_column(
        &self,
        comm: &CommSpec,
        client: &Client,
        dst_graph_name: &str,
        ctx: &ContextWrapper,
        selectors: &str,
    ) -> Result<GraphWrapper, Error> {
        let w = self.as_property("AddColumn")?;
        let context_type = ctx.context_type();
        if !matches!(
            context_type,
            ContextType::VertexData
                | ContextType::LabeledVertexData
                | ContextType::VertexProperty
                | ContextType::LabeledVertexProperty
        ) {
            return Err(Error::new(
                ErrorKind::IllegalState,
                format!("Illegal context type: {}", context_type),
            ));
        }

        // The vertex map the context was computed against.
        let ctx_wrapper = ctx.fragment_wrapper();
        let vm_id_from_ctx = match ctx_wrapper.as_ref() {
            GraphWrapper::Property(cw) => cw.frag.vertex_map_id(),
            GraphWrapper::Projected(cw) => cw.frag.base().vertex_map_id(),
            other => {
                return Err(Error::new(
                    ErrorKind::IllegalState,
                    format!(
                        "context fragment is not columnar: {}",
                        other.graph_def().graph_type
                    ),
                ));
            }
        };

        let columns: BTreeMap<i32, Vec<(String, ArrayRef)>> = match context_type {
            ContextType::VertexData | ContextType::VertexProperty => {
                let v_label = match ctx_wrapper.as_ref() {
                    GraphWrapper::Projected(cw) => cw.frag.v_label(),
                    GraphWrapper::Property(_) => 0,
                    _ => unreachable!("columnar checked above"),
                };
                let selectors = Selector::parse_selectors(selectors)?;
                let arrays = ctx.to_arrow_arrays(comm, &selectors)?;
                BTreeMap::from([(v_label, arrays)])
            }
            ContextType::LabeledVertexData | ContextType::LabeledVertexProperty => {
                let selectors = LabeledSelector::parse_selectors(selectors)?;
                ctx.to_labeled_arrow_arrays(comm, &selectors)?
            }
            _ => unreachable!("context type checked above"),
        };

        let ctx_meta = client.get_meta(vm_id_from_ctx)?;
        let cur_meta = client.get_meta(w.frag.vertex_map_id())?;
        let ctx_fnum: usize = ctx_meta.get_key_value("fnum")?;
        let cur_fnum: usize = cur_meta.get_key_value("fnum")?;
        if ctx_fnum != cur_fnum {
            return Err(Error::new(
                ErrorKind::IllegalState,
                "Fragment number of context differ from the destination fragment",
            ));
        }

        for label in columns.keys() {
            if w.frag.schema().vertex_label_name(*label).is_none() {
                return Err(Error::new(
                    ErrorKind::IllegalState,
                    format!("Label id {} is invalid in the destination fragment", label),
                ));
            }
            for fid in 0..cur_fnum {
                for member in ["o2g", "oid_arrays"] {
                    let name = format!("{}_{}_{}", member, fid, label);
                    let id_in_ctx = ctx_meta.get_member(&name)?;
                    let id_in_cur = cur_meta.get_member(&name)?;
                    if id_in_ctx != id_in_cur {
                        return Err(Error::new(
                            ErrorKind::IllegalState,
                            format!(
                                "Vertex datastructure {} in context differ from vertex map of the destination fragment",
                                name
                            ),
                        ));
                    }
                }
            }
        }

        let (new_frag_id, new_frag) = w.frag.add_vertex_columns(client, &columns)?;
        let group_id = construct_fragment_group(client, comm, new_frag_id)?;
        let mut graph_def = property_graph_def(dst_graph_name, &new_frag, group_id);
        graph_def.generate_eid = w.graph_def.generate_eid;
        Ok(GraphWrapper::Property(PropertyGraphWrapper {
            graph_def,
            frag: new_frag,
            frag_id: new_frag_id,
        }))
    }

    /// Serializes one selected column of this graph's vertices.
    pub fn to_ndarray(
        &self,
        comm: &CommSpec,
        selector: &LabeledSelector,
        range: &VertexRange,
    ) -> Result<Archive, Error> {
        let w = self.as_property("graphToNumpy")?;
        let trans = TransformUtils::new(comm, &w.frag);
        let label_id = selector.label_id;
        if w.frag.schema().vertex_label_name(label_id).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("invalid label id: {}", label_id),
            ));
        }
        let vertices = trans.select_vertices(label_id, range);
        let mut arc = Archive::new();
        let total = comm.reduce_sum_i64(vertices.len() as i64)?;
        if comm.worker_id() == 0 {
            let total = total.expect("reduce returns the total at the root");
            arc.write_i64(1);
            arc.write_i64(total);
            let type_code = match &selector.selector {
                Selector::VertexId => store::arrow_type_code(&arrow_schema::DataType::Int64)?,
                Selector::VertexLabelId => {
                    store::arrow_type_code(&arrow_schema::DataType::Int32)?
                }
                Selector::VertexData => Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    "labeled graphs expose properties, not a data slot",
                ))?,
                Selector::VertexProperty(name) => {
                    let prop = self.resolve_property(label_id, name)?;
                    store::arrow_type_code(&w.frag.vertex_property_type(label_id, prop)?)?
                }
                other => Err(unsupported_selector(other))?,
            };
            arc.write_i32(type_code);
            arc.write_i64(total);
        } else {
            // Non-root archives carry only the payload; the dispatch policy
            // keeps worker 0's copy.
            self.check_serializable(label_id, selector)?;
        }
        let old_size = arc.len();
        match &selector.selector {
            Selector::VertexId => trans.serialize_vertex_id(&vertices, label_id, &mut arc),
            Selector::VertexLabelId => {
                trans.serialize_vertex_label_id(&vertices, label_id, &mut arc)
            }
            Selector::VertexProperty(name) => {
                let prop = self.resolve_property(label_id, name)?;
                trans.serialize_vertex_property(&vertices, label_id, prop, &mut arc)?;
            }
            other => return Err(unsupported_selector(other)),
        }
        gather_archives(&mut arc, comm, old_size)?;
        Ok(arc)
    }

    /// Serializes multiple selected columns of this graph's vertices.
    pub fn to_dataframe(
        &self,
        comm: &CommSpec,
        selectors: &[(String, LabeledSelector)],
        range: &VertexRange,
    ) -> Result<Archive, Error> {
        let w = self.as_property("graphToDataframe")?;
        let trans = TransformUtils::new(comm, &w.frag);
        let label_id = LabeledSelector::vertex_label_id(selectors)?;
        if w.frag.schema().vertex_label_name(label_id).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("invalid label id: {}", label_id),
            ));
        }
        let vertices = trans.select_vertices(label_id, range);
        let mut arc = Archive::new();
        let total = comm.reduce_sum_i64(vertices.len() as i64)?;
        if comm.worker_id() == 0 {
            let total = total.expect("reduce returns the total at the root");
            arc.write_i64(selectors.len() as i64);
            arc.write_i64(total);
        }
        for (col_name, selector) in selectors {
            if comm.worker_id() == 0 {
                arc.write_str(col_name);
                let type_code = match &selector.selector {
                    Selector::VertexId => store::arrow_type_code(&arrow_schema::DataType::Int64)?,
                    Selector::VertexLabelId => {
                        store::arrow_type_code(&arrow_schema::DataType::Int32)?
                    }
                    Selector::VertexProperty(name) => {
                        let prop = self.resolve_property(label_id, name)?;
                        store::arrow_type_code(&w.frag.vertex_property_type(label_id, prop)?)?
                    }
                    other => Err(unsupported_selector(other))?,
                };
                arc.write_i32(type_code);
            } else {
                self.check_serializable(label_id, selector)?;
            }
            let old_size = arc.len();
            match &selector.selector {
                Selector::VertexId => trans.serialize_vertex_id(&vertices, label_id, &mut arc),
                Selector::VertexLabelId => {
                    trans.serialize_vertex_label_id(&vertices, label_id, &mut arc)
                }
                Selector::VertexProperty(name) => {
                    let prop = self.resolve_property(label_id, name)?;
                    trans.serialize_vertex_property(&vertices, label_id, prop, &mut arc)?;
                }
                other => return Err(unsupported_selector(other)),
            }
            gather_archives(&mut arc, comm, old_size)?;
        }
        Ok(arc)
    }

    fn resolve_property(&self, label_id: i32, name: &str) -> Result<i32, Error> {
        let w = self.as_property("property lookup")?;
        w.frag
            .schema()
            .vertex_property_id(label_id, name)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidValue,
                    format!("Invalid property name: {}", name),
                )
            })
    }

    fn check_serializable(&self, label_id: i32, selector: &LabeledSelector) -> Result<(), Error> {
        match &selector.selector {
            Selector::VertexId | Selector::VertexLabelId => Ok(()),
            Selector::VertexProperty(name) => self.resolve_property(label_id, name).map(|_| ()),
            Selector::VertexData => Err(Error::new(
                ErrorKind::UnsupportedOperation,
                "labeled graphs expose properties, not a data slot",
            )),
            other => Err(unsupported_selector(other)),
        }
    }

    /// The property schema, for columnar variants.
    pub fn schema(&self) -> Result<&PropertyGraphSchema, Error> {
        Ok(self.as_property("schema access")?.frag.schema())
    }
}

fn unsupported_selector(selector: &Selector) -> Error {
    Error::new(
        ErrorKind::UnsupportedOperation,
        format!(
            "Unsupported operation, available selector type: vid,vdata selector: {:?}",
            selector
        ),
    )
}
