// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The attribute map carried by every command.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::def::GraphType;

/// Keys recognized in a command's attribute map.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum ParamKey {
    /// Registry id of a graph.
    GraphName,
    /// Representation of a graph to create.
    GraphType,
    /// Whether a dynamic graph is directed.
    Directed,
    /// Canonical encoding of a fragment's type tuple.
    TypeSignature,
    /// Registry id of an algorithm.
    AppName,
    /// Path of an algorithm library.
    AppLibraryPath,
    /// Path of a graph-type library.
    GraphLibraryPath,
    /// Registry id of a context.
    CtxName,
    /// Selector expression(s).
    Selector,
    /// JSON-encoded vertex range filter.
    VertexRange,
    /// Tensor axis.
    Axis,
    /// Object-store id of a fragment group.
    VineyardId,
    /// Target representation of a conversion.
    DstGraphType,
    /// Copy mode, `identical` or `reset`.
    CopyType,
    /// View mode of a dynamic graph view.
    ViewType,
    /// Mutation mode for vertex/edge modification.
    ModifyType,
    /// Vertex lines.
    Nodes,
    /// Edge lines.
    Edges,
    /// Vertex label to property-id projection, JSON encoded.
    VertexCollections,
    /// Edge label to property-id projection, JSON encoded.
    EdgeCollections,
    /// Whether to generate edge ids at load time.
    GenerateEid,
    /// Path of a JSON property-schema file.
    SchemaPath,
    /// Kind of report requested from the dynamic-graph reporter.
    ReportType,
    /// Vertex argument of a report.
    Node,
    /// Edge argument of a report.
    Edge,
    /// Vertex property key used by a simple projection.
    VPropKey,
    /// Edge property key used by a simple projection.
    EPropKey,
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Mutation mode for MODIFY_VERTICES / MODIFY_EDGES.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ModifyType {
    /// Insert, ignoring existing entries' data.
    Add,
    /// Insert or overwrite data.
    Update,
    /// Remove.
    Delete,
}

/// Kind of report answered by the dynamic-graph reporter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// Global vertex count.
    NodeNum,
    /// Global edge count.
    EdgeNum,
    /// Membership test for one vertex.
    HasNode,
    /// Membership test for one edge.
    HasEdge,
    /// Attributes of one vertex.
    NodeData,
    /// Attributes of one edge.
    EdgeData,
    /// Degree of one vertex.
    Degree,
    /// Neighbor list of one vertex.
    Neighbors,
}

/// A value in a command's attribute map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    I64(i64),
    /// A 64-bit float.
    F64(f64),
    /// A string.
    Str(String),
    /// A list of strings.
    StrList(Vec<String>),
    /// A graph type.
    GraphType(GraphType),
    /// A modify type.
    ModifyType(ModifyType),
    /// A report type.
    ReportType(ReportType),
}
