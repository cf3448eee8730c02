// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Point and aggregate reports over dynamic graphs.
//!
//! Counts are reduced across the worker set, so every worker reports the same
//! value. Point lookups are answered by the owning fragment and come back
//! empty elsewhere; the dispatcher publishes them with the first-non-empty
//! aggregation policy.

use comm::CommSpec;
use serde_json::Value;

use graph_types::{Error, ErrorKind, ParamKey, Params, ReportType};

use crate::dynamic_fragment::DynamicFragment;
use crate::oid::Oid;

/// Answers REPORT_GRAPH queries over a dynamic fragment.
#[derive(Debug)]
pub struct DynamicGraphReporter<'a> {
    comm: &'a CommSpec,
}

impl<'a> DynamicGraphReporter<'a> {
    /// Creates a reporter.
    pub fn new(comm: &'a CommSpec) -> DynamicGraphReporter<'a> {
        DynamicGraphReporter { comm }
    }

    /// Runs one report, returning this worker's JSON answer. Workers that do
    /// not own the probed element return an empty string.
    pub fn report(&self, frag: &DynamicFragment, params: &Params) -> Result<String, Error> {
        let report_type: ReportType = params.get(ParamKey::ReportType)?;
        match report_type {
            ReportType::NodeNum => {
                let total = self
                    .comm
                    .all_reduce_sum_i64(frag.node_num_local() as i64)?;
                Ok(Value::from(total).to_string())
            }
            ReportType::EdgeNum => {
                let total = self
                    .comm
                    .all_reduce_sum_i64(frag.edge_num_local() as i64)?;
                Ok(Value::from(total).to_string())
            }
            ReportType::HasNode => {
                let oid = self.node_arg(params)?;
                Ok(render_option(
                    frag.has_node_local(&oid).map(Value::from),
                ))
            }
            ReportType::HasEdge => {
                let (u, v) = self.edge_arg(params)?;
                Ok(render_option(
                    frag.has_edge_local(&u, &v).map(Value::from),
                ))
            }
            ReportType::NodeData => {
                let oid = self.node_arg(params)?;
                Ok(render_option(
                    frag.node_data_local(&oid)
                        .map(|data| data.map_or(Value::Null, Value::Object)),
                ))
            }
            ReportType::EdgeData => {
                let (u, v) = self.edge_arg(params)?;
                Ok(render_option(
                    frag.edge_data_local(&u, &v)
                        .map(|data| data.map_or(Value::Null, Value::Object)),
                ))
            }
            ReportType::Degree => {
                let oid = self.node_arg(params)?;
                Ok(render_option(frag.degree_local(&oid).map(|deg| {
                    deg.map_or(Value::Null, Value::from)
                })))
            }
            ReportType::Neighbors => {
                let oid = self.node_arg(params)?;
                Ok(render_option(frag.neighbors_local(&oid).map(|n| {
                    n.map_or(Value::Null, Value::from)
                })))
            }
        }
    }

    fn node_arg(&self, params: &Params) -> Result<Oid, Error> {
        let raw: String = params.get(ParamKey::Node)?;
        let value: Value = serde_json::from_str(&raw)?;
        Oid::from_json(&value)
    }

    fn edge_arg(&self, params: &Params) -> Result<(Oid, Oid), Error> {
        let raw: String = params.get(ParamKey::Edge)?;
        let value: Value = serde_json::from_str(&raw)?;
        let pair = value.as_array().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("edge argument must be a two-element array: {}", raw),
            )
        })?;
        if pair.len() != 2 {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!("edge argument must be a two-element array: {}", raw),
            ));
        }
        Ok((Oid::from_json(&pair[0])?, Oid::from_json(&pair[1])?))
    }
}

fn render_option(value: Option<Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
