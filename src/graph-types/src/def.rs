// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Graph metadata records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The representation of a materialized graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GraphType {
    /// Columnar, immutable, labeled property graph.
    ArrowProperty,
    /// Columnar projection restricted to one vertex and one edge label.
    ArrowProjected,
    /// Mutable graph with heterogeneous JSON attributes.
    DynamicProperty,
    /// Projection of a dynamic graph onto a single property pair.
    DynamicProjected,
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            GraphType::ArrowProperty => "ARROW_PROPERTY",
            GraphType::ArrowProjected => "ARROW_PROJECTED",
            GraphType::DynamicProperty => "DYNAMIC_PROPERTY",
            GraphType::DynamicProjected => "DYNAMIC_PROJECTED",
        };
        f.write_str(s)
    }
}

/// The granularity of a query context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ContextType {
    /// No vertex association.
    Tensor,
    /// One scalar per vertex of a single implicit label.
    VertexData,
    /// One scalar per vertex, per label.
    LabeledVertexData,
    /// Multiple named columns per vertex of a single implicit label.
    VertexProperty,
    /// Multiple named columns per vertex, per label.
    LabeledVertexProperty,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ContextType::Tensor => "tensor",
            ContextType::VertexData => "vertex_data",
            ContextType::LabeledVertexData => "labeled_vertex_data",
            ContextType::VertexProperty => "vertex_property",
            ContextType::LabeledVertexProperty => "labeled_vertex_property",
        };
        f.write_str(s)
    }
}

/// Type names and the property schema of a graph.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Name of the original-id type.
    pub oid_type: String,
    /// Name of the internal vertex-id type.
    pub vid_type: String,
    /// Name of the vertex-data type.
    pub vdata_type: String,
    /// Name of the edge-data type.
    pub edata_type: String,
    /// JSON rendering of the property schema.
    pub property_schema_json: String,
}

/// Metadata for every materialized graph.
///
/// A `vineyard_id` of `-1` denotes a graph without shared-store backing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
    /// The registry id of the graph.
    pub key: String,
    /// The representation of the graph.
    pub graph_type: GraphType,
    /// Whether edges are directed.
    pub directed: bool,
    /// The object-store id of the graph's fragment group, or -1.
    pub vineyard_id: i64,
    /// Type names and the property schema.
    pub schema_def: SchemaDef,
    /// The path the schema was read from, if any.
    pub schema_path: Option<String>,
    /// Whether edge ids were generated at load time.
    pub generate_eid: bool,
}

impl GraphDef {
    /// Creates a graph def with no store backing and an empty schema.
    pub fn new(key: String, graph_type: GraphType, directed: bool) -> GraphDef {
        GraphDef {
            key,
            graph_type,
            directed,
            vineyard_id: -1,
            schema_def: SchemaDef::default(),
            schema_path: None,
            generate_eid: false,
        }
    }
}
