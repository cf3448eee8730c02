// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The analytical engine.
//!
//! The engine runs as a symmetric set of workers, each holding one fragment
//! of a partitioned property graph. A coordinator broadcasts typed commands;
//! every worker dispatches the same command against its per-worker registry
//! of graph wrappers, loaded algorithms, and query contexts, cooperating
//! through the communicator's collectives whenever shared-memory artifacts
//! are reshaped.
//!
//! Serialized results use a little-endian archive. An ndarray is framed as
//! `[num_columns=1: i64][total: i64][type_code: i32][total: i64][payload]`; a
//! dataframe as `[num_columns: i64][total: i64]` followed, per column, by a
//! length-prefixed name, an `i32` type code, and the payload. Per-worker
//! payload sections are concatenated at worker 0 in ascending worker order.

mod app;
mod apps;
mod context;
mod instance;
mod registry;
mod server;
mod utils;
mod wrapper;

pub use app::{AppEntry, AppModule, AppOutput, AppWorker, EngineSpec, APP_ABI_VERSION};
pub use context::{ContextData, ContextKind, ContextWrapper};
pub use instance::Instance;
pub use registry::ObjectRegistry;
pub use server::{serve, Config, LocalClient, Server};
pub use utils::{
    GraphModule, GraphUtils, Projector, ProjectorModule, BUILTIN_DYNAMIC_PROJECTED_SIG,
    BUILTIN_LIB_PATH, BUILTIN_PROJECTED_SIG, BUILTIN_PROPERTY_SIG, GRAPH_ABI_VERSION,
};
pub use wrapper::GraphWrapper;
