// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end command scenarios against a two-worker engine.

use std::collections::HashMap;
use std::error::Error;

use engine::{serve, Config, LocalClient};
use graph_types::{
    ArchiveReader, AttrValue, Command, CommandKind, CommandResponse, ErrorKind, GraphType,
    ModifyType, ParamKey, Params, QueryArgs, ReportType,
};

fn config() -> Config {
    Config {
        workers: 2,
        ipc_socket: "/tmp/engine-test.sock".to_string(),
        rpc_endpoint: "127.0.0.1:9600".to_string(),
    }
}

fn command(kind: CommandKind, attrs: Vec<(ParamKey, AttrValue)>) -> Command {
    Command::new(kind, Params::from_iter(attrs))
}

fn strs(items: &[&str]) -> AttrValue {
    AttrValue::StrList(items.iter().map(|s| s.to_string()).collect())
}

async fn create_dynamic_graph(
    client: &mut LocalClient,
    directed: bool,
) -> Result<String, Box<dyn Error>> {
    let response = client
        .execute(command(
            CommandKind::CreateGraph,
            vec![
                (ParamKey::GraphType, AttrValue::GraphType(GraphType::DynamicProperty)),
                (ParamKey::Directed, AttrValue::Bool(directed)),
            ],
        ))
        .await?;
    Ok(response.graph_def.expect("create returns a graph def").key)
}

async fn create_arrow_graph(
    client: &mut LocalClient,
    nodes: &[&str],
    edges: &[&str],
    generate_eid: bool,
) -> Result<graph_types::GraphDef, Box<dyn Error>> {
    let response = client
        .execute(command(
            CommandKind::CreateGraph,
            vec![
                (ParamKey::GraphType, AttrValue::GraphType(GraphType::ArrowProperty)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::Nodes, strs(nodes)),
                (ParamKey::Edges, strs(edges)),
                (ParamKey::Directed, AttrValue::Bool(true)),
                (ParamKey::GenerateEid, AttrValue::Bool(generate_eid)),
            ],
        ))
        .await?;
    Ok(response.graph_def.expect("create returns a graph def"))
}

async fn report_count(
    client: &mut LocalClient,
    graph: &str,
    report_type: ReportType,
) -> Result<i64, Box<dyn Error>> {
    let response = client
        .execute(command(
            CommandKind::ReportGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.to_string())),
                (ParamKey::ReportType, AttrValue::ReportType(report_type)),
            ],
        ))
        .await?;
    Ok(response.data_utf8()?.parse()?)
}

/// Reads a dataframe archive into named columns of JSON values.
fn parse_dataframe(
    response: &CommandResponse,
) -> Result<Vec<(String, Vec<serde_json::Value>)>, Box<dyn Error>> {
    let mut reader = ArchiveReader::new(&response.data);
    let num_columns = reader.read_i64()?;
    let total = reader.read_i64()?;
    let mut out = Vec::new();
    for _ in 0..num_columns {
        let name = reader.read_str()?;
        let type_code = reader.read_i32()?;
        let mut values = Vec::new();
        for _ in 0..total {
            let value = match type_code {
                7 => serde_json::Value::from(reader.read_i32()?),
                9 => serde_json::Value::from(reader.read_i64()?),
                12 => serde_json::Value::from(reader.read_f64()?),
                13 => serde_json::Value::from(reader.read_str()?),
                other => return Err(format!("unexpected type code {}", other).into()),
            };
            values.push(value);
        }
        out.push((name, values));
    }
    assert_eq!(reader.remaining(), 0);
    Ok(out)
}

#[tokio::test]
async fn test_create_query_materialize() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let graph = create_dynamic_graph(&mut client, true).await?;
    client
        .execute(command(
            CommandKind::ModifyVertices,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Nodes, strs(&["1", "2", "3"])),
            ],
        ))
        .await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2", "2 3"])),
            ],
        ))
        .await?;

    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://sssp".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();

    let mut run = command(
        CommandKind::RunApp,
        vec![
            (ParamKey::AppName, AttrValue::Str(app)),
            (ParamKey::GraphName, AttrValue::Str(graph)),
        ],
    );
    run.query_args = Some(QueryArgs(serde_json::json!({"src": 1})));
    let response = client.execute(run).await?;
    let run_result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    assert_eq!(run_result["context_type"], "vertex_data");
    let ctx = run_result["context_key"].as_str().unwrap().to_string();

    let response = client
        .execute(command(
            CommandKind::ContextToDataframe,
            vec![
                (ParamKey::CtxName, AttrValue::Str(ctx)),
                (ParamKey::Selector, AttrValue::Str("v.id,r".to_string())),
            ],
        ))
        .await?;
    let columns = parse_dataframe(&response)?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].0, "v.id");
    assert_eq!(columns[0].1.len(), 3);

    let distances: HashMap<i64, f64> = columns[0]
        .1
        .iter()
        .zip(&columns[1].1)
        .map(|(id, dist)| (id.as_i64().unwrap(), dist.as_f64().unwrap()))
        .collect();
    assert_eq!(distances[&1], 0.0);
    assert_eq!(distances[&2], 1.0);
    assert_eq!(distances[&3], 2.0);
    Ok(())
}

#[tokio::test]
async fn test_add_column_round_trip() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let def = create_arrow_graph(
        &mut client,
        &["person 1", "person 2", "person 3"],
        &["knows 1 2", "knows 2 3"],
        true,
    )
    .await?;
    assert!(def.generate_eid);
    assert!(def.vineyard_id > 0);

    let response = client
        .execute(command(
            CommandKind::ProjectToSimple,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROJECTED_SIG.to_string()),
                ),
            ],
        ))
        .await?;
    let projected = response.graph_def.unwrap();
    assert_eq!(projected.graph_type, GraphType::ArrowProjected);

    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://pagerank".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();

    let mut run = command(
        CommandKind::RunApp,
        vec![
            (ParamKey::AppName, AttrValue::Str(app)),
            (ParamKey::GraphName, AttrValue::Str(projected.key.clone())),
        ],
    );
    run.query_args = Some(QueryArgs(serde_json::json!({"max_round": 5})));
    let response = client.execute(run).await?;
    let run_result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let ctx = run_result["context_key"].as_str().unwrap().to_string();

    let response = client
        .execute(command(
            CommandKind::AddColumn,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (ParamKey::CtxName, AttrValue::Str(ctx)),
                (ParamKey::Selector, AttrValue::Str("rank=r".to_string())),
            ],
        ))
        .await?;
    let new_def = response.graph_def.unwrap();
    assert_eq!(new_def.graph_type, GraphType::ArrowProperty);
    assert!(new_def.generate_eid);
    assert_ne!(new_def.vineyard_id, def.vineyard_id);

    // The appended column is selectable on the new graph.
    let response = client
        .execute(command(
            CommandKind::GraphToDataframe,
            vec![
                (ParamKey::GraphName, AttrValue::Str(new_def.key.clone())),
                (
                    ParamKey::Selector,
                    AttrValue::Str("#0:v.id,#0:v.property.rank".to_string()),
                ),
            ],
        ))
        .await?;
    let columns = parse_dataframe(&response)?;
    assert_eq!(columns[1].1.len(), 3);
    for rank in &columns[1].1 {
        assert!(rank.as_f64().unwrap() > 0.0);
    }
    Ok(())
}

#[tokio::test]
async fn test_convert_round_trip() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let def = create_arrow_graph(
        &mut client,
        &[
            r#"person 1 {"age": 20}"#,
            r#"person 2 {"age": 30}"#,
            r#"person 3 {"age": 40}"#,
        ],
        &["knows 1 2", "knows 2 3"],
        false,
    )
    .await?;

    let response = client
        .execute(command(
            CommandKind::TransformGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (
                    ParamKey::DstGraphType,
                    AttrValue::GraphType(GraphType::DynamicProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
            ],
        ))
        .await?;
    let dynamic = response.graph_def.unwrap();
    assert_eq!(dynamic.graph_type, GraphType::DynamicProperty);
    assert_eq!(report_count(&mut client, &dynamic.key, ReportType::NodeNum).await?, 3);
    assert_eq!(report_count(&mut client, &dynamic.key, ReportType::EdgeNum).await?, 2);

    let response = client
        .execute(command(
            CommandKind::TransformGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(dynamic.key.clone())),
                (
                    ParamKey::DstGraphType,
                    AttrValue::GraphType(GraphType::ArrowProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
            ],
        ))
        .await?;
    let back = response.graph_def.unwrap();
    assert_eq!(back.graph_type, GraphType::ArrowProperty);

    let response = client
        .execute(command(
            CommandKind::GraphToDataframe,
            vec![
                (ParamKey::GraphName, AttrValue::Str(back.key.clone())),
                (
                    ParamKey::Selector,
                    AttrValue::Str("#0:v.id,#0:v.property.age".to_string()),
                ),
            ],
        ))
        .await?;
    let columns = parse_dataframe(&response)?;
    let ages: HashMap<i64, i64> = columns[0]
        .1
        .iter()
        .zip(&columns[1].1)
        .map(|(id, age)| (id.as_i64().unwrap(), age.as_i64().unwrap()))
        .collect();
    assert_eq!(ages, HashMap::from([(1, 20), (2, 30), (3, 40)]));
    Ok(())
}

#[tokio::test]
async fn test_induce_subgraph_on_disconnected_selection() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let graph = create_dynamic_graph(&mut client, false).await?;
    client
        .execute(command(
            CommandKind::ModifyVertices,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Nodes, strs(&["1", "2", "3", "4", "5"])),
            ],
        ))
        .await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2", "2 3", "4 5"])),
            ],
        ))
        .await?;

    let response = client
        .execute(command(
            CommandKind::InduceSubgraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph)),
                (ParamKey::Nodes, strs(&["1", "2", "3"])),
            ],
        ))
        .await?;
    let sub = response.graph_def.unwrap();
    assert_eq!(report_count(&mut client, &sub.key, ReportType::NodeNum).await?, 3);
    assert_eq!(report_count(&mut client, &sub.key, ReportType::EdgeNum).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_directed_round_trip_preserves_graph() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let graph = create_dynamic_graph(&mut client, false).await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2", "2 3", "3 1"])),
            ],
        ))
        .await?;

    let response = client
        .execute(command(
            CommandKind::ToDirected,
            vec![(ParamKey::GraphName, AttrValue::Str(graph.clone()))],
        ))
        .await?;
    let directed = response.graph_def.unwrap();
    assert!(directed.directed);

    let response = client
        .execute(command(
            CommandKind::ToUnDirected,
            vec![(ParamKey::GraphName, AttrValue::Str(directed.key))],
        ))
        .await?;
    let back = response.graph_def.unwrap();
    assert!(!back.directed);
    assert_eq!(report_count(&mut client, &back.key, ReportType::NodeNum).await?, 3);
    assert_eq!(report_count(&mut client, &back.key, ReportType::EdgeNum).await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_copy_then_unload_copy_leaves_original() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let graph = create_dynamic_graph(&mut client, false).await?;
    client
        .execute(command(
            CommandKind::ModifyVertices,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Nodes, strs(&["1", "2"])),
            ],
        ))
        .await?;

    let response = client
        .execute(command(
            CommandKind::CopyGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::CopyType, AttrValue::Str("identical".to_string())),
            ],
        ))
        .await?;
    let copy = response.graph_def.unwrap();
    assert_ne!(copy.key, graph);

    client
        .execute(command(
            CommandKind::UnloadGraph,
            vec![(ParamKey::GraphName, AttrValue::Str(copy.key))],
        ))
        .await?;
    assert_eq!(report_count(&mut client, &graph, ReportType::NodeNum).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_variant_operation_support() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let arrow = create_arrow_graph(&mut client, &["person 1"], &[], false).await?;
    let dynamic = create_dynamic_graph(&mut client, true).await?;

    // Copy / to-directed / view on a columnar graph are rejected.
    let err = client
        .execute(command(
            CommandKind::ToDirected,
            vec![(ParamKey::GraphName, AttrValue::Str(arrow.key.clone()))],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    let err = client
        .execute(command(
            CommandKind::ViewGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(arrow.key.clone())),
                (ParamKey::ViewType, AttrValue::Str("reversed".to_string())),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    // Project / add-column on a dynamic graph are rejected.
    let err = client
        .execute(command(
            CommandKind::ProjectGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(dynamic.clone())),
                (ParamKey::VertexCollections, AttrValue::Str("{\"0\": []}".to_string())),
                (ParamKey::EdgeCollections, AttrValue::Str("{}".to_string())),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    // Empty vertex selection on a columnar graph is invalid.
    let err = client
        .execute(command(
            CommandKind::ProjectGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(arrow.key.clone())),
                (ParamKey::VertexCollections, AttrValue::Str("{}".to_string())),
                (ParamKey::EdgeCollections, AttrValue::Str("{}".to_string())),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    // A copy of a projection is rejected.
    let response = client
        .execute(command(
            CommandKind::ProjectToSimple,
            vec![
                (ParamKey::GraphName, AttrValue::Str(dynamic)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_DYNAMIC_PROJECTED_SIG.to_string()),
                ),
            ],
        ))
        .await?;
    let projected = response.graph_def.unwrap();
    let err = client
        .execute(command(
            CommandKind::CopyGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(projected.key)),
                (ParamKey::CopyType, AttrValue::Str("identical".to_string())),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    Ok(())
}

/// Reads an ndarray archive into JSON values.
fn parse_ndarray(response: &CommandResponse) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
    let mut reader = ArchiveReader::new(&response.data);
    assert_eq!(reader.read_i64()?, 1);
    let total = reader.read_i64()?;
    let type_code = reader.read_i32()?;
    assert_eq!(reader.read_i64()?, total);
    let mut values = Vec::new();
    for _ in 0..total {
        values.push(match type_code {
            7 => serde_json::Value::from(reader.read_i32()?),
            9 => serde_json::Value::from(reader.read_i64()?),
            12 => serde_json::Value::from(reader.read_f64()?),
            13 => serde_json::Value::from(reader.read_str()?),
            other => return Err(format!("unexpected type code {}", other).into()),
        });
    }
    assert_eq!(reader.remaining(), 0);
    Ok(values)
}

#[tokio::test]
async fn test_graph_to_numpy_counts_all_shards() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let def = create_arrow_graph(
        &mut client,
        &["person 1", "person 2", "person 3", "person 4"],
        &["knows 1 2"],
        false,
    )
    .await?;

    let response = client
        .execute(command(
            CommandKind::GraphToNumpy,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key)),
                (ParamKey::Selector, AttrValue::Str("#0:v.id".to_string())),
            ],
        ))
        .await?;
    let ids = parse_ndarray(&response)?;
    let mut ids: Vec<i64> = ids.iter().map(|v| v.as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn test_add_column_rejects_foreign_vertex_map() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let nodes = ["person 1", "person 2"];
    let edges = ["knows 1 2"];
    let first = create_arrow_graph(&mut client, &nodes, &edges, false).await?;
    let second = create_arrow_graph(&mut client, &nodes, &edges, false).await?;

    let response = client
        .execute(command(
            CommandKind::ProjectToSimple,
            vec![
                (ParamKey::GraphName, AttrValue::Str(first.key)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROJECTED_SIG.to_string()),
                ),
            ],
        ))
        .await?;
    let projected = response.graph_def.unwrap();

    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://wcc".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();
    let response = client
        .execute(command(
            CommandKind::RunApp,
            vec![
                (ParamKey::AppName, AttrValue::Str(app)),
                (ParamKey::GraphName, AttrValue::Str(projected.key)),
            ],
        ))
        .await?;
    let run_result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let ctx = run_result["context_key"].as_str().unwrap().to_string();

    // The context was computed against the first graph's vertex map; adding
    // its columns to the second graph violates vertex-map identity.
    let err = client
        .execute(command(
            CommandKind::AddColumn,
            vec![
                (ParamKey::GraphName, AttrValue::Str(second.key)),
                (ParamKey::CtxName, AttrValue::Str(ctx)),
                (ParamKey::Selector, AttrValue::Str("comp=r".to_string())),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    Ok(())
}

#[tokio::test]
async fn test_convert_rejects_parallel_edges_across_labels() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let def = create_arrow_graph(
        &mut client,
        &["person 1", "person 2"],
        &["knows 1 2", "likes 1 2"],
        false,
    )
    .await?;

    let err = client
        .execute(command(
            CommandKind::TransformGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key)),
                (
                    ParamKey::DstGraphType,
                    AttrValue::GraphType(GraphType::DynamicProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
            ],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    Ok(())
}

#[tokio::test]
async fn test_view_graph_over_dynamic() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let graph = create_dynamic_graph(&mut client, true).await?;
    let response = client
        .execute(command(
            CommandKind::ViewGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph)),
                (ParamKey::ViewType, AttrValue::Str("reversed".to_string())),
            ],
        ))
        .await?;
    let view = response.graph_def.unwrap();
    assert!(view.key.starts_with("graph_view_"));
    assert_eq!(view.graph_type, GraphType::DynamicProperty);
    Ok(())
}

#[tokio::test]
async fn test_app_lifecycle() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://sssp".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();
    client
        .execute(command(
            CommandKind::UnloadApp,
            vec![(ParamKey::AppName, AttrValue::Str(app.clone()))],
        ))
        .await?;
    let err = client
        .execute(command(
            CommandKind::UnloadApp,
            vec![(ParamKey::AppName, AttrValue::Str(app))],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://does-not-exist".to_string()),
            )],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    Ok(())
}

#[tokio::test]
async fn test_register_graph_type_is_idempotent() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    // Re-registering the compiled-in signature succeeds without reloading.
    client
        .execute(command(
            CommandKind::RegisterGraphType,
            vec![
                (ParamKey::GraphType, AttrValue::GraphType(GraphType::ArrowProperty)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::GraphLibraryPath, AttrValue::Str("builtin".to_string())),
            ],
        ))
        .await?;

    // A fresh signature bound to the compiled-in module serves loads.
    client
        .execute(command(
            CommandKind::RegisterGraphType,
            vec![
                (ParamKey::GraphType, AttrValue::GraphType(GraphType::ArrowProperty)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str("arrow_property<int64_t,uint64_t,compact>".to_string()),
                ),
                (ParamKey::GraphLibraryPath, AttrValue::Str("builtin".to_string())),
            ],
        ))
        .await?;
    let response = client
        .execute(command(
            CommandKind::CreateGraph,
            vec![
                (ParamKey::GraphType, AttrValue::GraphType(GraphType::ArrowProperty)),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str("arrow_property<int64_t,uint64_t,compact>".to_string()),
                ),
                (ParamKey::Nodes, strs(&["person 1"])),
                (ParamKey::Directed, AttrValue::Bool(true)),
            ],
        ))
        .await?;
    assert!(response.graph_def.is_some());
    Ok(())
}

#[tokio::test]
async fn test_engine_config() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let response = client
        .execute(command(CommandKind::GetEngineConfig, vec![]))
        .await?;
    let conf: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    assert_eq!(conf["dynamic_graph"], "ON");
    assert_eq!(conf["vineyard_socket"], "/tmp/engine-test.sock");
    Ok(())
}

#[tokio::test]
async fn test_project_graph_restricts_properties() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let def = create_arrow_graph(
        &mut client,
        &[r#"person 1 {"age": 20, "score": 0.5}"#, r#"person 2 {"age": 30, "score": 0.7}"#],
        &["knows 1 2"],
        false,
    )
    .await?;

    let response = client
        .execute(command(
            CommandKind::ProjectGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (ParamKey::VertexCollections, AttrValue::Str("{\"0\": [0]}".to_string())),
                (ParamKey::EdgeCollections, AttrValue::Str("{\"0\": []}".to_string())),
            ],
        ))
        .await?;
    let projected = response.graph_def.unwrap();
    assert_eq!(projected.graph_type, GraphType::ArrowProperty);
    assert!(projected.vineyard_id > 0);
    assert_ne!(projected.vineyard_id, def.vineyard_id);
    let schema = projected.schema_def.property_schema_json;
    assert!(schema.contains("age"));
    assert!(!schema.contains("score"));
    Ok(())
}

#[tokio::test]
async fn test_add_labels_extends_schema() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let def = create_arrow_graph(&mut client, &["person 1", "person 2"], &["knows 1 2"], false)
        .await?;

    let response = client
        .execute(command(
            CommandKind::AddLabels,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::Nodes, strs(&["city 10", "city 11"])),
            ],
        ))
        .await?;
    let extended = response.graph_def.unwrap();
    assert_ne!(extended.vineyard_id, def.vineyard_id);
    assert!(extended.schema_def.property_schema_json.contains("city"));

    let response = client
        .execute(command(
            CommandKind::GraphToNumpy,
            vec![
                (ParamKey::GraphName, AttrValue::Str(extended.key)),
                (ParamKey::Selector, AttrValue::Str("#1:v.id".to_string())),
            ],
        ))
        .await?;
    let mut ids: Vec<i64> = parse_ndarray(&response)?
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![10, 11]);
    Ok(())
}

#[tokio::test]
async fn test_clear_graph_and_edges() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let graph = create_dynamic_graph(&mut client, false).await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2", "2 3"])),
            ],
        ))
        .await?;

    client
        .execute(command(
            CommandKind::ClearEdges,
            vec![(ParamKey::GraphName, AttrValue::Str(graph.clone()))],
        ))
        .await?;
    assert_eq!(report_count(&mut client, &graph, ReportType::EdgeNum).await?, 0);
    assert_eq!(report_count(&mut client, &graph, ReportType::NodeNum).await?, 3);

    client
        .execute(command(
            CommandKind::ClearGraph,
            vec![(ParamKey::GraphName, AttrValue::Str(graph.clone()))],
        ))
        .await?;
    assert_eq!(report_count(&mut client, &graph, ReportType::NodeNum).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_context_to_numpy() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;
    let graph = create_dynamic_graph(&mut client, true).await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2", "2 3"])),
            ],
        ))
        .await?;
    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://sssp".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();
    let mut run = command(
        CommandKind::RunApp,
        vec![
            (ParamKey::AppName, AttrValue::Str(app)),
            (ParamKey::GraphName, AttrValue::Str(graph)),
        ],
    );
    run.query_args = Some(QueryArgs(serde_json::json!({"src": 1})));
    let response = client.execute(run).await?;
    let run_result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let ctx = run_result["context_key"].as_str().unwrap().to_string();

    let response = client
        .execute(command(
            CommandKind::ContextToNumpy,
            vec![
                (ParamKey::CtxName, AttrValue::Str(ctx)),
                (ParamKey::Selector, AttrValue::Str("r".to_string())),
            ],
        ))
        .await?;
    let mut distances: Vec<f64> = parse_ndarray(&response)?
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(distances, vec![0.0, 1.0, 2.0]);
    Ok(())
}

#[tokio::test]
async fn test_materialize_context_into_store() -> Result<(), Box<dyn Error>> {
    let (_server, mut client) = serve(config())?;

    let graph = create_dynamic_graph(&mut client, true).await?;
    client
        .execute(command(
            CommandKind::ModifyEdges,
            vec![
                (ParamKey::GraphName, AttrValue::Str(graph.clone())),
                (ParamKey::ModifyType, AttrValue::ModifyType(ModifyType::Add)),
                (ParamKey::Edges, strs(&["1 2"])),
            ],
        ))
        .await?;
    let response = client
        .execute(command(
            CommandKind::CreateApp,
            vec![(
                ParamKey::AppLibraryPath,
                AttrValue::Str("builtin://wcc".to_string()),
            )],
        ))
        .await?;
    let app = response.data_utf8()?.to_string();
    let response = client
        .execute(command(
            CommandKind::RunApp,
            vec![
                (ParamKey::AppName, AttrValue::Str(app)),
                (ParamKey::GraphName, AttrValue::Str(graph)),
            ],
        ))
        .await?;
    let run_result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let ctx = run_result["context_key"].as_str().unwrap().to_string();

    let response = client
        .execute(command(
            CommandKind::ToVineyardTensor,
            vec![
                (ParamKey::CtxName, AttrValue::Str(ctx.clone())),
                (ParamKey::Selector, AttrValue::Str("r".to_string())),
            ],
        ))
        .await?;
    let result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let tensor_id = result["object_id"].as_str().unwrap().to_string();
    assert!(tensor_id.starts_with('o'));

    let response = client
        .execute(command(
            CommandKind::ToVineyardDataframe,
            vec![
                (ParamKey::CtxName, AttrValue::Str(ctx)),
                (ParamKey::Selector, AttrValue::Str("v.id,r".to_string())),
            ],
        ))
        .await?;
    let result: serde_json::Value = serde_json::from_str(response.data_utf8()?)?;
    let frame_id = result["object_id"].as_str().unwrap();
    assert!(frame_id.starts_with('o'));
    assert_ne!(frame_id, tensor_id);
    Ok(())
}
