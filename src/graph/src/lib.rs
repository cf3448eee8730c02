// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Graph representations for the analytical engine.
//!
//! Two families of fragments live here. [`PropertyFragment`] is the columnar,
//! immutable, labeled representation whose property tables are Arrow arrays
//! and whose bytes live in the shared object store. [`DynamicFragment`] is the
//! mutable representation with heterogeneous JSON attributes that backs the
//! networkx-style surface. Projections restrict either family to a single
//! label and at most one property per element, which is the shape the
//! algorithms consume. Converters translate between the two families by
//! rebuilding the vertex map and traversing every inner vertex.

mod columns;
mod convert;
mod dynamic_fragment;
mod dynamic_vertex_map;
mod ids;
mod oid;
mod projected;
mod property_fragment;
mod reporter;
mod schema;
mod transform;
mod vertex_map;

pub use columns::{
    build_column, column_f64, column_value, infer_type, serialize_column, type_from_name,
    type_name,
};
pub use convert::{ArrowToDynamicConverter, DynamicToArrowConverter};
pub use dynamic_fragment::{
    parse_edge_line, parse_vertex_line, parse_view_type, Attrs, DynamicFragment,
    DynamicFragmentView, ViewType,
};
pub use dynamic_vertex_map::DynamicVertexMap;
pub use ids::IdParser;
pub use oid::{partition_for, Oid};
pub use projected::{ArrowProjectedFragment, DynamicProjectedFragment};
pub use property_fragment::{EdgeTable, PropertyFragment};
pub use reporter::DynamicGraphReporter;
pub use schema::{LabelSchema, PropertyGraphSchema, PropertySchema};
pub use transform::{gather_archives, TransformUtils};
pub use vertex_map::PropertyVertexMap;

use std::sync::Arc;

/// A shared handle on a concrete fragment, in any representation.
#[derive(Clone, Debug)]
pub enum FragmentHandle {
    /// A columnar labeled property fragment.
    Property(Arc<PropertyFragment>),
    /// A projection of a columnar fragment.
    Projected(Arc<ArrowProjectedFragment>),
    /// A mutable dynamic fragment.
    Dynamic(Arc<DynamicFragment>),
    /// A projection of a dynamic fragment.
    DynamicProjected(Arc<DynamicProjectedFragment>),
    /// A read-only view over a dynamic fragment.
    DynamicView(Arc<DynamicFragmentView>),
}
