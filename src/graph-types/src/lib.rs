// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shared types for the graph engine's command surface.
//!
//! This crate defines everything that crosses the boundary between the
//! coordinator and the worker set: graph metadata ([`GraphDef`]), the command
//! envelope ([`Command`]) with its typed attribute map ([`Params`]), the
//! per-worker result record ([`DispatchResult`]) with its aggregation policy,
//! the closed error set ([`Error`]), the selector grammar, and the binary
//! archive used to ship serialized columns to the coordinator.

mod archive;
mod attr;
mod command;
mod def;
mod error;
mod params;
mod result;
mod selector;

pub use archive::{Archive, ArchiveReader};
pub use attr::{AttrValue, ModifyType, ParamKey, ReportType};
pub use command::{Command, CommandKind, QueryArgs};
pub use def::{ContextType, GraphDef, GraphType, SchemaDef};
pub use error::{Error, ErrorKind};
pub use params::Params;
pub use result::{aggregate, AggregatePolicy, CommandResponse, DispatchResult, ResultPayload};
pub use selector::{LabeledSelector, Selector, VertexRange};
