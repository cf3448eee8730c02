// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The columnar, immutable, labeled property fragment.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::{Array, ArrayRef};
use arrow_schema::DataType;

use graph_types::{Error, ErrorKind};
use store::{Client, ObjectId, ObjectMeta};

use crate::schema::{PropertyGraphSchema, PropertySchema};
use crate::vertex_map::PropertyVertexMap;

/// The store type name of a columnar fragment.
pub const ARROW_FRAGMENT_TYPE: &str = "engine::ArrowFragment";

/// One edge label's storage: the edge property table plus the out-adjacency
/// of every inner vertex.
#[derive(Clone, Debug)]
pub struct EdgeTable {
    /// Edge property columns; rows are edges stored on this fragment.
    pub columns: Vec<ArrayRef>,
    /// `[v_label][offset]` -> (destination gid, edge row) pairs.
    pub out_adj: Vec<Vec<Vec<(u64, usize)>>>,
}

/// A worker's shard of a labeled columnar graph.
///
/// Inner vertices of each (fid, label) pair form a contiguous block; property
/// tables are Arrow arrays whose rows align with the block's offsets. The
/// fragment holds its vertex map by reference; rebuilding operations (column
/// addition, projection) produce a new fragment that shares the map.
#[derive(Clone, Debug)]
pub struct PropertyFragment {
    fid: usize,
    fnum: usize,
    directed: bool,
    generate_eid: bool,
    schema: PropertyGraphSchema,
    vertex_map: Arc<PropertyVertexMap>,
    // [v_label] -> property columns, rows in offset order.
    vertex_tables: Vec<Vec<ArrayRef>>,
    // [e_label].
    edge_tables: Vec<EdgeTable>,
}

impl PropertyFragment {
    /// Assembles a fragment from loader output.
    pub fn new(
        fid: usize,
        fnum: usize,
        directed: bool,
        generate_eid: bool,
        schema: PropertyGraphSchema,
        vertex_map: Arc<PropertyVertexMap>,
        vertex_tables: Vec<Vec<ArrayRef>>,
        edge_tables: Vec<EdgeTable>,
    ) -> PropertyFragment {
        assert_eq!(vertex_tables.len(), schema.vertex_labels.len());
        assert_eq!(edge_tables.len(), schema.edge_labels.len());
        PropertyFragment {
            fid,
            fnum,
            directed,
            generate_eid,
            schema,
            vertex_map,
            vertex_tables,
            edge_tables,
        }
    }

    /// This fragment's id.
    pub fn fid(&self) -> usize {
        self.fid
    }

    /// The total number of fragments.
    pub fn fnum(&self) -> usize {
        self.fnum
    }

    /// Whether edges are directed.
    pub fn directed(&self) -> bool {
        self.directed
    }

    /// Whether edge ids were generated at load time.
    pub fn generate_eid(&self) -> bool {
        self.generate_eid
    }

    /// The property schema.
    pub fn schema(&self) -> &PropertyGraphSchema {
        &self.schema
    }

    /// The shared vertex map.
    pub fn vertex_map(&self) -> &Arc<PropertyVertexMap> {
        &self.vertex_map
    }

    /// The store id of the shared vertex map.
    pub fn vertex_map_id(&self) -> ObjectId {
        self.vertex_map.meta_id()
    }

    /// The number of vertex labels.
    pub fn vertex_label_num(&self) -> usize {
        self.schema.vertex_labels.len()
    }

    /// The number of edge labels.
    pub fn edge_label_num(&self) -> usize {
        self.schema.edge_labels.len()
    }

    /// The offsets of this fragment's inner vertices of one label.
    pub fn inner_vertices(&self, label: i32) -> std::ops::Range<usize> {
        0..self.vertex_map.inner_vertex_size(self.fid, label)
    }

    /// The oid of an inner vertex.
    pub fn get_oid(&self, label: i32, offset: usize) -> i64 {
        self.vertex_map.oids(self.fid, label)[offset]
    }

    /// The number of properties of a vertex label.
    pub fn vertex_property_num(&self, label: i32) -> usize {
        self.schema
            .vertex_labels
            .get(label as usize)
            .map_or(0, |l| l.properties.len())
    }

    /// The columnar type of a vertex property.
    pub fn vertex_property_type(&self, label: i32, prop: i32) -> Result<DataType, Error> {
        self.vertex_property_schema(label, prop)?.arrow_type()
    }

    /// The schema entry of a vertex property.
    pub fn vertex_property_schema(&self, label: i32, prop: i32) -> Result<&PropertySchema, Error> {
        self.schema
            .vertex_labels
            .get(label as usize)
            .and_then(|l| l.properties.get(prop as usize))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidValue,
                    format!("invalid property id: {}", prop),
                )
            })
    }

    /// The column backing a vertex property.
    pub fn vertex_column(&self, label: i32, prop: i32) -> Result<&ArrayRef, Error> {
        self.vertex_tables
            .get(label as usize)
            .and_then(|t| t.get(prop as usize))
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidValue,
                    format!("invalid property id: {}", prop),
                )
            })
    }

    /// All columns of one vertex label.
    pub fn vertex_table(&self, label: i32) -> &[ArrayRef] {
        &self.vertex_tables[label as usize]
    }

    /// One edge label's storage.
    pub fn edge_table(&self, e_label: i32) -> &EdgeTable {
        &self.edge_tables[e_label as usize]
    }

    /// The out-edges of an inner vertex under one edge label.
    pub fn out_edges(&self, e_label: i32, v_label: i32, offset: usize) -> &[(u64, usize)] {
        &self.edge_tables[e_label as usize].out_adj[v_label as usize][offset]
    }

    fn store_meta(&self) -> ObjectMeta {
        let mut meta = ObjectMeta::new(ARROW_FRAGMENT_TYPE);
        meta.set_key_value("fid", self.fid);
        meta.set_key_value("fnum", self.fnum);
        meta.set_key_value("directed", if self.directed { 1 } else { 0 });
        meta.set_key_value("oid_type", "int64_t");
        meta.set_key_value("vid_type", "uint64_t");
        meta.set_key_value("schema", self.schema.to_json_string());
        meta.add_member("vertex_map", self.vertex_map.meta_id());
        meta
    }

    /// Writes the fragment into the store, returning its object id and the
    /// shared handle.
    pub fn register(self, client: &Client) -> Result<(ObjectId, Arc<PropertyFragment>), Error> {
        let meta = self.store_meta();
        let frag = Arc::new(self);
        let id = client.put_object(meta, Arc::clone(&frag) as store::Payload)?;
        client.persist(id)?;
        Ok((id, frag))
    }

    /// Builds a new fragment with extra vertex property columns appended to
    /// the given labels, sharing this fragment's vertex map.
    ///
    /// Each column's row count must equal the label's inner-vertex count.
    pub fn add_vertex_columns(
        &self,
        client: &Client,
        columns: &BTreeMap<i32, Vec<(String, ArrayRef)>>,
    ) -> Result<(ObjectId, Arc<PropertyFragment>), Error> {
        let mut schema = self.schema.clone();
        let mut vertex_tables = self.vertex_tables.clone();
        for (label, cols) in columns {
            let inner = self.vertex_map.inner_vertex_size(self.fid, *label);
            let label_schema = schema
                .vertex_labels
                .get_mut(*label as usize)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::IllegalState,
                        format!("Label id {} is invalid in the destination fragment", label),
                    )
                })?;
            for (name, array) in cols {
                if array.len() != inner {
                    return Err(Error::new(
                        ErrorKind::IllegalState,
                        format!(
                            "column {} has {} rows but label {} has {} inner vertices",
                            name,
                            array.len(),
                            label,
                            inner
                        ),
                    ));
                }
                label_schema
                    .properties
                    .push(PropertySchema::new(name, array.data_type())?);
                vertex_tables[*label as usize].push(Arc::clone(array));
            }
        }
        let frag = PropertyFragment {
            schema,
            vertex_tables,
            ..self.clone()
        };
        frag.register(client)
    }

    /// Builds a new fragment restricted to the selected vertex properties and
    /// edge labels, sharing this fragment's vertex map.
    ///
    /// Every vertex label survives (the vertex map covers them all); labels
    /// outside the selection keep no properties. Edge labels outside the
    /// selection are dropped entirely.
    pub fn project(
        &self,
        client: &Client,
        vertices: &BTreeMap<i32, Vec<i32>>,
        edges: &BTreeMap<i32, Vec<i32>>,
    ) -> Result<(ObjectId, Arc<PropertyFragment>), Error> {
        let mut schema = PropertyGraphSchema::default();
        let mut vertex_tables = Vec::new();
        for (label_id, label_schema) in self.schema.vertex_labels.iter().enumerate() {
            let mut props = Vec::new();
            let mut table = Vec::new();
            if let Some(selected) = vertices.get(&(label_id as i32)) {
                for prop in selected {
                    props.push(self.vertex_property_schema(label_id as i32, *prop)?.clone());
                    table.push(Arc::clone(self.vertex_column(label_id as i32, *prop)?));
                }
            }
            schema.vertex_labels.push(crate::schema::LabelSchema {
                label: label_schema.label.clone(),
                properties: props,
            });
            vertex_tables.push(table);
        }
        let mut edge_tables = Vec::new();
        for (e_label, selected) in edges {
            let src = self
                .schema
                .edge_labels
                .get(*e_label as usize)
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidValue,
                        format!("invalid edge label id: {}", e_label),
                    )
                })?;
            let table = self.edge_table(*e_label);
            let mut props = Vec::new();
            let mut columns = Vec::new();
            for prop in selected {
                let p = src.properties.get(*prop as usize).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidValue,
                        format!("invalid property id: {}", prop),
                    )
                })?;
                props.push(p.clone());
                columns.push(Arc::clone(&table.columns[*prop as usize]));
            }
            schema.edge_labels.push(crate::schema::LabelSchema {
                label: src.label.clone(),
                properties: props,
            });
            edge_tables.push(EdgeTable {
                columns,
                out_adj: table.out_adj.clone(),
            });
        }
        let frag = PropertyFragment {
            schema,
            vertex_tables,
            edge_tables,
            ..self.clone()
        };
        frag.register(client)
    }
}
