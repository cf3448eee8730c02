// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Simple-graph projections: one vertex label, zero or one property, one edge
//! label, zero or one property. This is the shape the algorithms consume.

use std::sync::Arc;

use graph_types::{Error, ErrorKind};

use crate::dynamic_fragment::DynamicFragment;
use crate::property_fragment::PropertyFragment;

/// A projection of a columnar fragment.
#[derive(Clone, Debug)]
pub struct ArrowProjectedFragment {
    base: Arc<PropertyFragment>,
    v_label: i32,
    v_prop: Option<i32>,
    e_label: i32,
    e_prop: Option<i32>,
}

impl ArrowProjectedFragment {
    /// Projects `base` onto one vertex and one edge label.
    pub fn new(
        base: Arc<PropertyFragment>,
        v_label: i32,
        v_prop: Option<i32>,
        e_label: i32,
        e_prop: Option<i32>,
    ) -> Result<ArrowProjectedFragment, Error> {
        if base.schema().vertex_labels.get(v_label as usize).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("invalid vertex label id: {}", v_label),
            ));
        }
        if base.schema().edge_labels.get(e_label as usize).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("invalid edge label id: {}", e_label),
            ));
        }
        if let Some(prop) = v_prop {
            base.vertex_property_schema(v_label, prop)?;
        }
        Ok(ArrowProjectedFragment {
            base,
            v_label,
            v_prop,
            e_label,
            e_prop,
        })
    }

    /// The columnar fragment under the projection.
    pub fn base(&self) -> &Arc<PropertyFragment> {
        &self.base
    }

    /// The projected vertex label.
    pub fn v_label(&self) -> i32 {
        self.v_label
    }

    /// The projected vertex property, if any.
    pub fn v_prop(&self) -> Option<i32> {
        self.v_prop
    }

    /// The projected edge label.
    pub fn e_label(&self) -> i32 {
        self.e_label
    }

    /// The projected edge property, if any.
    pub fn e_prop(&self) -> Option<i32> {
        self.e_prop
    }
}

/// A projection of a dynamic fragment onto one vertex property and one edge
/// property.
#[derive(Clone, Debug)]
pub struct DynamicProjectedFragment {
    base: Arc<DynamicFragment>,
    v_prop: Option<String>,
    e_prop: Option<String>,
}

impl DynamicProjectedFragment {
    /// Projects `base` onto the named properties.
    pub fn new(
        base: Arc<DynamicFragment>,
        v_prop: Option<String>,
        e_prop: Option<String>,
    ) -> DynamicProjectedFragment {
        DynamicProjectedFragment {
            base,
            v_prop,
            e_prop,
        }
    }

    /// The dynamic fragment under the projection.
    pub fn base(&self) -> &Arc<DynamicFragment> {
        &self.base
    }

    /// The projected vertex property, if any.
    pub fn v_prop(&self) -> Option<&str> {
        self.v_prop.as_deref()
    }

    /// The projected edge property, if any.
    pub fn e_prop(&self) -> Option<&str> {
        self.e_prop.as_deref()
    }
}
