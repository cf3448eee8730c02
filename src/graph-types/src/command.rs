// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The command envelope issued by the coordinator.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// The kinds of commands the dispatcher implements.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CommandKind {
    CreateGraph,
    CreateApp,
    RunApp,
    UnloadApp,
    UnloadGraph,
    ReportGraph,
    ProjectGraph,
    ProjectToSimple,
    ModifyVertices,
    ModifyEdges,
    TransformGraph,
    CopyGraph,
    ToDirected,
    ToUnDirected,
    InduceSubgraph,
    ClearGraph,
    ClearEdges,
    ViewGraph,
    AddLabels,
    ContextToNumpy,
    ContextToDataframe,
    ToVineyardTensor,
    ToVineyardDataframe,
    AddColumn,
    GraphToNumpy,
    GraphToDataframe,
    RegisterGraphType,
    GetEngineConfig,
}

/// Algorithm-specific query arguments, forwarded opaquely to the algorithm.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs(pub serde_json::Value);

/// A tagged command with its attribute map and optional query arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The operation to perform.
    pub kind: CommandKind,
    /// The command's attribute map.
    pub params: Params,
    /// Algorithm arguments, for RUN_APP.
    pub query_args: Option<QueryArgs>,
}

impl Command {
    /// Creates a command without query arguments.
    pub fn new(kind: CommandKind, params: Params) -> Command {
        Command {
            kind,
            params,
            query_args: None,
        }
    }
}
