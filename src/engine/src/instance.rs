// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The command dispatcher.
//!
//! One instance lives in each worker process. `on_receive` validates the
//! command's arguments, resolves referenced artifacts in the registry, routes
//! to the right operation, and publishes produced artifacts back to the
//! registry. Commands arrive in the same order on every worker; any operation
//! touching shared state follows validate → local compute → store write →
//! collective fence → optional worker-0 cleanup, so no worker can skip a
//! fence another worker entered.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use comm::CommSpec;
use graph::{
    parse_edge_line, parse_vertex_line, DynamicFragment, DynamicGraphReporter, Oid,
};
use graph_types::{
    AggregatePolicy, Command, CommandKind, DispatchResult, Error, ErrorKind, GraphDef, GraphType,
    LabeledSelector, ParamKey, Params, QueryArgs, VertexRange,
};
use ore::id_gen::IdGen;
use store::{fragment_of_group, Client, ObjectId};

use crate::app::{AppEntry, AppOutput, EngineSpec};
use crate::context::{ContextKind, ContextWrapper};
use crate::registry::ObjectRegistry;
use crate::utils::{
    GraphUtils, Projector, BUILTIN_DYNAMIC_PROJECTED_SIG, BUILTIN_LIB_PATH,
    BUILTIN_PROJECTED_SIG, BUILTIN_PROPERTY_SIG,
};
use crate::wrapper::GraphWrapper;

/// The engine configuration reported by GET_ENGINE_CONFIG.
#[derive(Debug, Serialize)]
struct EngineConfig {
    dynamic_graph: &'static str,
    vineyard_socket: String,
    vineyard_rpc_endpoint: String,
}

/// The per-worker dispatcher.
#[derive(Debug)]
pub struct Instance {
    comm: CommSpec,
    client: Client,
    object_manager: ObjectRegistry,
    id_gen: IdGen,
}

impl Instance {
    /// Creates a dispatcher and registers the compiled-in type modules.
    pub fn new(comm: CommSpec, client: Client) -> Instance {
        let mut object_manager = ObjectRegistry::new();
        let utils = GraphUtils::init(BUILTIN_PROPERTY_SIG, BUILTIN_LIB_PATH)
            .expect("compiled-in modules resolve");
        object_manager
            .put(BUILTIN_PROPERTY_SIG, Arc::new(utils))
            .expect("fresh registry has no collisions");
        for sig in [BUILTIN_PROJECTED_SIG, BUILTIN_DYNAMIC_PROJECTED_SIG] {
            let projector =
                Projector::init(sig, BUILTIN_LIB_PATH).expect("compiled-in modules resolve");
            object_manager
                .put(sig, Arc::new(projector))
                .expect("fresh registry has no collisions");
        }
        Instance {
            comm,
            client,
            object_manager,
            id_gen: IdGen::default(),
        }
    }

    /// The registry, for inspection in tests.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.object_manager
    }

    fn generate_id(&mut self) -> u64 {
        self.id_gen.allocate_id()
    }

    fn load_graph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let graph_name = format!("graph_{}", self.generate_id());
        let graph_type: GraphType = params.get(ParamKey::GraphType)?;

        match graph_type {
            GraphType::DynamicProperty => {
                let directed: bool = params.get(ParamKey::Directed)?;
                debug!(%graph_name, directed, "loading graph, graph type: DynamicFragment");
                let fragment = Arc::new(DynamicFragment::new(
                    self.comm.fid(),
                    self.comm.fnum(),
                    directed,
                ));
                let wrapper = Arc::new(GraphWrapper::dynamic(&graph_name, fragment));
                let graph_def = wrapper.graph_def().clone();
                self.object_manager.put(&graph_name, wrapper)?;
                Ok(graph_def)
            }
            GraphType::ArrowProperty => {
                let type_sig: String = params.get(ParamKey::TypeSignature)?;
                debug!(%graph_name, %type_sig, "loading graph, graph type: ArrowFragment");
                let graph_utils = self.object_manager.get::<GraphUtils>(&type_sig)?;
                let wrapper = Arc::new(graph_utils.load_graph(
                    &self.comm,
                    &self.client,
                    &graph_name,
                    params,
                )?);
                let graph_def = wrapper.graph_def().clone();
                self.object_manager.put(&graph_name, wrapper)?;
                Ok(graph_def)
            }
            other => Err(Error::new(
                ErrorKind::InvalidValue,
                format!("Unsupported graph type {}", other),
            )),
        }
    }

    fn unload_graph(&mut self, params: &Params) -> Result<(), Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        if params.has(ParamKey::VineyardId) {
            let frag_group_id = ObjectId::from_i64(params.get::<i64>(ParamKey::VineyardId)?);
            let exists = self.client.exists(frag_group_id)?;
            if exists {
                let frag_id =
                    fragment_of_group(&self.client, frag_group_id, self.comm.fid())?;
                self.client.del_data(frag_id)?;
            }
            self.comm.barrier();
            if exists && self.comm.worker_id() == 0 {
                // The group may already be gone; deleting it is optional.
                let _ = self.client.del_data(frag_group_id);
            }
        }
        self.object_manager.remove(&graph_name)
    }

    fn load_app(&mut self, params: &Params) -> Result<String, Error> {
        let app_name = format!("app_{}", self.generate_id());
        let lib_path: String = params.get(ParamKey::AppLibraryPath)?;
        let app = AppEntry::init(&app_name, &lib_path)?;
        self.object_manager.put(&app_name, Arc::new(app))?;
        Ok(app_name)
    }

    fn unload_app(&mut self, params: &Params) -> Result<(), Error> {
        let app_name: String = params.get(ParamKey::AppName)?;
        self.object_manager.remove(&app_name)
    }

    fn query(&mut self, params: &Params, query_args: &QueryArgs) -> Result<String, Error> {
        let app_name: String = params.get(ParamKey::AppName)?;
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let app = self.object_manager.get::<AppEntry>(&app_name)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;

        let fragment = wrapper.fragment();
        let spec = EngineSpec::default();
        let context_key = format!("ctx_{}", self.generate_id());

        let mut worker = app.create_worker(&fragment, &spec)?;
        let output = app.query(worker.as_mut(), &self.comm, query_args)?;
        let context_type = match output {
            AppOutput::None => String::new(),
            AppOutput::VertexData(data) => {
                let ctx = ContextWrapper::new(
                    &context_key,
                    Arc::clone(&wrapper),
                    ContextKind::VertexData { data },
                );
                let context_type = ctx.context_type().to_string();
                self.object_manager.put(&context_key, Arc::new(ctx))?;
                context_type
            }
            AppOutput::VertexProperty(columns) => {
                let ctx = ContextWrapper::new(
                    &context_key,
                    Arc::clone(&wrapper),
                    ContextKind::VertexProperty { columns },
                );
                let context_type = ctx.context_type().to_string();
                self.object_manager.put(&context_key, Arc::new(ctx))?;
                context_type
            }
            AppOutput::Tensor { data, shape } => {
                let ctx = ContextWrapper::new(
                    &context_key,
                    Arc::clone(&wrapper),
                    ContextKind::Tensor { data, shape },
                );
                let context_type = ctx.context_type().to_string();
                self.object_manager.put(&context_key, Arc::new(ctx))?;
                context_type
            }
        };

        to_json(&[("context_type", &context_type), ("context_key", &context_key)])
    }

    fn report_graph(&mut self, params: &Params) -> Result<String, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let fragment = wrapper.dynamic_fragment()?;
        let reporter = DynamicGraphReporter::new(&self.comm);
        reporter.report(fragment, params)
    }

    fn modify_vertices(&mut self, params: &Params, vertices: &[String]) -> Result<(), Error> {
        let modify_type = params.get(ParamKey::ModifyType)?;
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        wrapper.dynamic_fragment()?.modify_vertices(vertices, modify_type)
    }

    fn modify_edges(&mut self, params: &Params, edges: &[String]) -> Result<(), Error> {
        let modify_type = params.get(ParamKey::ModifyType)?;
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        wrapper.dynamic_fragment()?.modify_edges(edges, modify_type)
    }

    fn parse_range(&self, params: &Params) -> Result<VertexRange, Error> {
        match params.get_opt::<String>(ParamKey::VertexRange)? {
            Some(raw) => VertexRange::parse(&raw),
            None => Ok(VertexRange::default()),
        }
    }

    fn context_to_numpy(&mut self, params: &Params) -> Result<Vec<u8>, Error> {
        let range = self.parse_range(params)?;
        let selector = params.get_opt::<String>(ParamKey::Selector)?.unwrap_or_default();
        let axis = params.get_opt::<i64>(ParamKey::Axis)?.unwrap_or(0);
        let ctx_name: String = params.get(ParamKey::CtxName)?;
        let ctx = self.object_manager.get::<ContextWrapper>(&ctx_name)?;
        Ok(ctx
            .to_ndarray(&self.comm, &selector, &range, axis)?
            .into_bytes())
    }

    fn context_to_dataframe(&mut self, params: &Params) -> Result<Vec<u8>, Error> {
        let range = self.parse_range(params)?;
        let selectors = params.get_opt::<String>(ParamKey::Selector)?.unwrap_or_default();
        let ctx_name: String = params.get(ParamKey::CtxName)?;
        let ctx = self.object_manager.get::<ContextWrapper>(&ctx_name)?;
        Ok(ctx.to_dataframe(&self.comm, &selectors, &range)?.into_bytes())
    }

    fn context_to_vineyard_tensor(&mut self, params: &Params) -> Result<String, Error> {
        let ctx_name: String = params.get(ParamKey::CtxName)?;
        let ctx = self.object_manager.get::<ContextWrapper>(&ctx_name)?;
        let range = self.parse_range(params)?;
        let selector = params.get_opt::<String>(ParamKey::Selector)?.unwrap_or_default();
        let axis = params.get_opt::<i64>(ParamKey::Axis)?.unwrap_or(0);
        let id = ctx.to_vineyard_tensor(&self.comm, &self.client, &selector, &range, axis)?;
        let s_id = id.to_string();
        self.client.put_name(id, &s_id)?;
        to_json(&[("object_id", &s_id)])
    }

    fn context_to_vineyard_dataframe(&mut self, params: &Params) -> Result<String, Error> {
        let ctx_name: String = params.get(ParamKey::CtxName)?;
        let ctx = self.object_manager.get::<ContextWrapper>(&ctx_name)?;
        let range = self.parse_range(params)?;
        let selectors = params.get_opt::<String>(ParamKey::Selector)?.unwrap_or_default();
        let id = ctx.to_vineyard_dataframe(&self.comm, &self.client, &selectors, &range)?;
        let s_id = id.to_string();
        self.client.put_name(id, &s_id)?;
        to_json(&[("object_id", &s_id)])
    }

    fn add_column(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let ctx_name: String = params.get(ParamKey::CtxName)?;
        let selectors: String = params.get(ParamKey::Selector)?;
        let frag_wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let ctx_wrapper = self.object_manager.get::<ContextWrapper>(&ctx_name)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());

        let new_wrapper = frag_wrapper.add_column(
            &self.comm,
            &self.client,
            &dst_graph_name,
            &ctx_wrapper,
            &selectors,
        )?;
        let graph_def = new_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(new_wrapper))?;
        Ok(graph_def)
    }

    fn project_graph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let vertices = parse_collections(&params.get::<String>(ParamKey::VertexCollections)?)?;
        let edges = parse_collections(&params.get::<String>(ParamKey::EdgeCollections)?)?;
        let frag_wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;

        let dst_graph_name = format!("graph_{}", self.generate_id());
        let new_wrapper = frag_wrapper.project(
            &self.comm,
            &self.client,
            &dst_graph_name,
            &vertices,
            &edges,
        )?;
        let graph_def = new_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(new_wrapper))?;
        Ok(graph_def)
    }

    fn project_to_simple(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let projected_id = format!("graph_projected_{}", self.generate_id());
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let type_sig: String = params.get(ParamKey::TypeSignature)?;
        debug!(%graph_name, %type_sig, "projecting graph");

        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let projector = self.object_manager.get::<Projector>(&type_sig)?;
        let projected = projector.project(&wrapper, &projected_id, params)?;
        let graph_def = projected.graph_def().clone();
        self.object_manager.put(&projected_id, Arc::new(projected))?;
        Ok(graph_def)
    }

    fn convert_graph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let src_graph_name: String = params.get(ParamKey::GraphName)?;
        let dst_graph_type: GraphType = params.get(ParamKey::DstGraphType)?;
        let type_sig: String = params.get(ParamKey::TypeSignature)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());
        debug!(
            %src_graph_name,
            %dst_graph_name,
            %dst_graph_type,
            %type_sig,
            "converting graph"
        );

        let g_utils = self.object_manager.get::<GraphUtils>(&type_sig)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&src_graph_name)?;
        let src_graph_type = src_wrapper.graph_def().graph_type;

        let dst_wrapper = match (src_graph_type, dst_graph_type) {
            (GraphType::ArrowProperty, GraphType::DynamicProperty) => {
                g_utils.to_dynamic_fragment(&self.comm, &src_wrapper, &dst_graph_name)?
            }
            (GraphType::DynamicProperty, GraphType::ArrowProperty) => {
                g_utils.to_arrow_fragment(&self.client, &self.comm, &src_wrapper, &dst_graph_name)?
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!(
                        "Unsupported conversion direction, from {} to {}",
                        src_graph_type, dst_graph_type
                    ),
                ));
            }
        };
        let graph_def = dst_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(dst_wrapper))?;
        Ok(graph_def)
    }

    fn copy_graph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let src_graph_name: String = params.get(ParamKey::GraphName)?;
        let copy_type: String = params.get(ParamKey::CopyType)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&src_graph_name)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());

        let dst_wrapper =
            src_wrapper.copy_graph(&self.comm, &self.client, &dst_graph_name, &copy_type)?;
        let graph_def = dst_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(dst_wrapper))?;
        Ok(graph_def)
    }

    fn to_directed(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let src_graph_name: String = params.get(ParamKey::GraphName)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&src_graph_name)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());

        let dst_wrapper = src_wrapper.to_directed(&dst_graph_name)?;
        let graph_def = dst_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(dst_wrapper))?;
        Ok(graph_def)
    }

    fn to_undirected(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let src_graph_name: String = params.get(ParamKey::GraphName)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&src_graph_name)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());

        let dst_wrapper = src_wrapper.to_undirected(&dst_graph_name)?;
        let graph_def = dst_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(dst_wrapper))?;
        Ok(graph_def)
    }

    fn induce_subgraph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let src_graph_name: String = params.get(ParamKey::GraphName)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&src_graph_name)?;
        let sub_graph_name = format!("graph_{}", self.generate_id());
        debug!(%src_graph_name, %sub_graph_name, "inducing subgraph");

        let mut induced_vertices: Vec<Oid> = Vec::new();
        let mut induced_edges: Vec<(Oid, Oid)> = Vec::new();
        let mut seen: HashSet<Oid> = HashSet::new();
        if params.has(ParamKey::Nodes) {
            for line in params.get::<Vec<String>>(ParamKey::Nodes)? {
                let (oid, _) = parse_vertex_line(&line)?;
                if seen.insert(oid.clone()) {
                    induced_vertices.push(oid);
                }
            }
        } else if params.has(ParamKey::Edges) {
            for line in params.get::<Vec<String>>(ParamKey::Edges)? {
                let (u, v, _) = parse_edge_line(&line)?;
                if seen.insert(u.clone()) {
                    induced_vertices.push(u.clone());
                }
                if seen.insert(v.clone()) {
                    induced_vertices.push(v.clone());
                }
                induced_edges.push((u, v));
            }
        } else {
            return Err(Error::new(
                ErrorKind::MissingKey,
                "induce subgraph needs nodes or edges",
            ));
        }

        let fragment = src_wrapper.dynamic_fragment()?;
        let sub_frag = fragment.induce_subgraph(&induced_vertices, &induced_edges)?;
        let mut graph_def = src_wrapper.graph_def().clone();
        graph_def.key = sub_graph_name.clone();
        let wrapper = GraphWrapper::Dynamic(crate::wrapper::DynamicGraphWrapper {
            graph_def: graph_def.clone(),
            frag: Arc::new(sub_frag),
        });
        self.object_manager.put(&sub_graph_name, Arc::new(wrapper))?;
        Ok(graph_def)
    }

    fn clear_graph(&mut self, params: &Params) -> Result<(), Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        wrapper.dynamic_fragment()?.clear();
        Ok(())
    }

    fn clear_edges(&mut self, params: &Params) -> Result<(), Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        wrapper.dynamic_fragment()?.clear_edges();
        Ok(())
    }

    fn create_graph_view(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let view_id = format!("graph_view_{}", self.generate_id());
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let view_type: String = params.get(ParamKey::ViewType)?;
        debug!(%view_id, %view_type, "creating graph view");

        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let view_wrapper = wrapper.create_graph_view(&view_id, &view_type)?;
        let graph_def = view_wrapper.graph_def().clone();
        self.object_manager.put(&view_id, Arc::new(view_wrapper))?;
        Ok(graph_def)
    }

    fn add_labels_to_graph(&mut self, params: &Params) -> Result<GraphDef, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let src_wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let src_frag_id = match src_wrapper.as_ref() {
            GraphWrapper::Property(w) => w.frag_id,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    "AddLabels is only available for ArrowFragment",
                ));
            }
        };
        let type_sig: String = params.get(ParamKey::TypeSignature)?;
        let graph_utils = self.object_manager.get::<GraphUtils>(&type_sig)?;
        let dst_graph_name = format!("graph_{}", self.generate_id());
        let dst_wrapper = graph_utils.add_labels_to_graph(
            src_frag_id,
            &self.comm,
            &self.client,
            &dst_graph_name,
            params,
        )?;
        let graph_def = dst_wrapper.graph_def().clone();
        self.object_manager.put(&dst_graph_name, Arc::new(dst_wrapper))?;
        Ok(graph_def)
    }

    fn graph_to_numpy(&mut self, params: &Params) -> Result<Vec<u8>, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let s_selector: String = params.get(ParamKey::Selector)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let range = self.parse_range(params)?;
        let selector = LabeledSelector::parse(&s_selector)?;
        Ok(wrapper.to_ndarray(&self.comm, &selector, &range)?.into_bytes())
    }

    fn graph_to_dataframe(&mut self, params: &Params) -> Result<Vec<u8>, Error> {
        let graph_name: String = params.get(ParamKey::GraphName)?;
        let wrapper = self.object_manager.get::<GraphWrapper>(&graph_name)?;
        let range = self.parse_range(params)?;
        let s_selectors: String = params.get(ParamKey::Selector)?;
        let selectors = LabeledSelector::parse_selectors(&s_selectors)?;
        Ok(wrapper
            .to_dataframe(&self.comm, &selectors, &range)?
            .into_bytes())
    }

    fn register_graph_type(&mut self, params: &Params) -> Result<(), Error> {
        let graph_type: GraphType = params.get(ParamKey::GraphType)?;
        let type_sig: String = params.get(ParamKey::TypeSignature)?;
        let lib_path: String = params.get(ParamKey::GraphLibraryPath)?;
        debug!(%graph_type, %type_sig, %lib_path, "registering graph type");

        if self.object_manager.has(&type_sig) {
            debug!(%type_sig, "graph type already registered");
            return Ok(());
        }

        match graph_type {
            GraphType::ArrowProperty => {
                let utils = GraphUtils::init(&type_sig, &lib_path)?;
                self.object_manager.put(&type_sig, Arc::new(utils))
            }
            GraphType::ArrowProjected | GraphType::DynamicProjected => {
                let projector = Projector::init(&type_sig, &lib_path)?;
                self.object_manager.put(&type_sig, Arc::new(projector))
            }
            GraphType::DynamicProperty => Err(Error::new(
                ErrorKind::InvalidValue,
                "Only ArrowProperty/ArrowProjected/DynamicProjected are accepted",
            )),
        }
    }

    fn engine_config(&self) -> Result<String, Error> {
        let conf = EngineConfig {
            dynamic_graph: "ON",
            vineyard_socket: self.client.ipc_socket().to_string(),
            vineyard_rpc_endpoint: self.client.rpc_endpoint().to_string(),
        };
        serde_json::to_string(&conf)
            .map_err(|e| Error::new(ErrorKind::IllegalState, e.to_string()))
    }

    /// Dispatches one command, producing this worker's result record.
    pub fn on_receive(&mut self, cmd: &Command) -> Result<DispatchResult, Error> {
        let mut r = DispatchResult::new(self.comm.worker_id());
        let params = &cmd.params;

        match cmd.kind {
            CommandKind::CreateGraph => {
                r.set_graph_def(self.load_graph(params)?);
            }
            CommandKind::CreateApp => {
                let app_name = self.load_app(params)?;
                r.set_data(app_name.into_bytes());
            }
            CommandKind::RunApp => {
                let default_args = QueryArgs::default();
                let query_args = cmd.query_args.as_ref().unwrap_or(&default_args);
                let ctx_json = self.query(params, query_args)?;
                r.set_data(ctx_json.into_bytes());
            }
            CommandKind::UnloadApp => {
                self.unload_app(params)?;
            }
            CommandKind::UnloadGraph => {
                self.unload_graph(params)?;
            }
            CommandKind::ReportGraph => {
                let report = self.report_graph(params)?;
                r.set_data_with_policy(report.into_bytes(), AggregatePolicy::PickFirstNonEmpty);
            }
            CommandKind::ProjectGraph => {
                r.set_graph_def(self.project_graph(params)?);
            }
            CommandKind::ProjectToSimple => {
                r.set_graph_def(self.project_to_simple(params)?);
            }
            CommandKind::ModifyVertices => {
                let vertices = params.get::<Vec<String>>(ParamKey::Nodes)?;
                self.modify_vertices(params, &vertices)?;
            }
            CommandKind::ModifyEdges => {
                let edges = params.get::<Vec<String>>(ParamKey::Edges)?;
                self.modify_edges(params, &edges)?;
            }
            CommandKind::TransformGraph => {
                r.set_graph_def(self.convert_graph(params)?);
            }
            CommandKind::CopyGraph => {
                r.set_graph_def(self.copy_graph(params)?);
            }
            CommandKind::ToDirected => {
                r.set_graph_def(self.to_directed(params)?);
            }
            CommandKind::ToUnDirected => {
                r.set_graph_def(self.to_undirected(params)?);
            }
            CommandKind::InduceSubgraph => {
                r.set_graph_def(self.induce_subgraph(params)?);
            }
            CommandKind::ClearGraph => {
                self.clear_graph(params)?;
            }
            CommandKind::ClearEdges => {
                self.clear_edges(params)?;
            }
            CommandKind::ViewGraph => {
                r.set_graph_def(self.create_graph_view(params)?);
            }
            CommandKind::AddLabels => {
                r.set_graph_def(self.add_labels_to_graph(params)?);
            }
            CommandKind::ContextToNumpy => {
                let arc = self.context_to_numpy(params)?;
                r.set_data_with_policy(arc, AggregatePolicy::PickFirst);
            }
            CommandKind::ContextToDataframe => {
                let arc = self.context_to_dataframe(params)?;
                r.set_data_with_policy(arc, AggregatePolicy::PickFirst);
            }
            CommandKind::ToVineyardTensor => {
                let id_json = self.context_to_vineyard_tensor(params)?;
                r.set_data(id_json.into_bytes());
            }
            CommandKind::ToVineyardDataframe => {
                let id_json = self.context_to_vineyard_dataframe(params)?;
                r.set_data(id_json.into_bytes());
            }
            CommandKind::AddColumn => {
                r.set_graph_def(self.add_column(params)?);
            }
            CommandKind::GraphToNumpy => {
                let arc = self.graph_to_numpy(params)?;
                r.set_data_with_policy(arc, AggregatePolicy::PickFirst);
            }
            CommandKind::GraphToDataframe => {
                let arc = self.graph_to_dataframe(params)?;
                r.set_data_with_policy(arc, AggregatePolicy::PickFirst);
            }
            CommandKind::RegisterGraphType => {
                self.register_graph_type(params)?;
            }
            CommandKind::GetEngineConfig => {
                let conf = self.engine_config()?;
                r.set_data_with_policy(conf.into_bytes(), AggregatePolicy::PickFirst);
            }
        }
        Ok(r)
    }
}

fn parse_collections(raw: &str) -> Result<BTreeMap<i32, Vec<i32>>, Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidValue,
            format!("label collections must be a JSON object: {}", raw),
        )
    })?;
    let mut out = BTreeMap::new();
    for (label, props) in object {
        let label_id: i32 = label.parse().map_err(|_| {
            Error::new(
                ErrorKind::InvalidValue,
                format!("label id is not an integer: {}", label),
            )
        })?;
        let props = props
            .as_array()
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidValue,
                    format!("property list for label {} must be an array", label),
                )
            })?
            .iter()
            .map(|p| {
                p.as_i64().map(|p| p as i32).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidValue,
                        format!("property id is not an integer: {}", p),
                    )
                })
            })
            .collect::<Result<Vec<i32>, Error>>()?;
        out.insert(label_id, props);
    }
    Ok(out)
}

fn to_json(fields: &[(&str, &str)]) -> Result<String, Error> {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::to_string(&map).map_err(|e| Error::new(ErrorKind::IllegalState, e.to_string()))
}
