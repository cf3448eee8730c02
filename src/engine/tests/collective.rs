// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Collective-discipline scenarios that need direct access to the store and
//! the per-worker registries.

use std::error::Error;
use std::thread;

use comm::Switchboard;
use engine::Instance;
use graph_types::{
    AttrValue, Command, CommandKind, DispatchResult, ErrorKind, GraphType, ParamKey, Params,
    ResultPayload,
};
use store::{ObjectId, Store};

fn command(kind: CommandKind, attrs: Vec<(ParamKey, AttrValue)>) -> Command {
    Command::new(kind, Params::from_iter(attrs))
}

fn strs(items: &[&str]) -> AttrValue {
    AttrValue::StrList(items.iter().map(|s| s.to_string()).collect())
}

/// Runs one closure per worker in lock-step threads, returning the per-worker
/// results in worker order.
fn run_workers<F, T>(store: &Store, workers: usize, f: F) -> Vec<T>
where
    F: Fn(usize, Instance) -> T + Sync,
    T: Send,
{
    let specs = Switchboard::allocate(workers);
    thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = specs
            .into_iter()
            .enumerate()
            .map(|(worker_id, spec)| {
                let client = store.client();
                s.spawn(move || f(worker_id, Instance::new(spec, client)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn graph_def_of(result: &DispatchResult) -> graph_types::GraphDef {
    match &result.payload {
        ResultPayload::GraphDef(def) => def.clone(),
        other => panic!("expected a graph def, got {:?}", other),
    }
}

#[test]
fn test_unload_graph_deletes_shards_and_group() -> Result<(), Box<dyn Error>> {
    let store = Store::open("/tmp/engine-test.sock", "127.0.0.1:9600");

    let results = run_workers(&store, 2, |_, mut instance| {
        let create = command(
            CommandKind::CreateGraph,
            vec![
                (
                    ParamKey::GraphType,
                    AttrValue::GraphType(GraphType::ArrowProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::Nodes, strs(&["person 1", "person 2"])),
                (ParamKey::Edges, strs(&["knows 1 2"])),
                (ParamKey::Directed, AttrValue::Bool(true)),
            ],
        );
        let def = graph_def_of(&instance.on_receive(&create).unwrap());

        let unload = command(
            CommandKind::UnloadGraph,
            vec![
                (ParamKey::GraphName, AttrValue::Str(def.key.clone())),
                (ParamKey::VineyardId, AttrValue::I64(def.vineyard_id)),
            ],
        );
        instance.on_receive(&unload).unwrap();
        let still_registered = instance.registry().has(&def.key);
        (def, still_registered)
    });

    let (def0, has0) = &results[0];
    let (def1, has1) = &results[1];
    // Workers agreed on the published metadata and both dropped the entry.
    assert_eq!(def0, def1);
    assert!(!*has0);
    assert!(!*has1);

    // The fragment group and both shards are gone from the store.
    let client = store.client();
    let group = ObjectId::from_i64(def0.vineyard_id);
    assert!(!client.exists(group)?);
    Ok(())
}

#[test]
fn test_create_publishes_identical_artifacts_on_every_worker() -> Result<(), Box<dyn Error>> {
    let store = Store::open("/tmp/engine-test.sock", "127.0.0.1:9600");

    let results = run_workers(&store, 2, |_, mut instance| {
        let create = command(
            CommandKind::CreateGraph,
            vec![
                (
                    ParamKey::GraphType,
                    AttrValue::GraphType(GraphType::ArrowProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::Nodes, strs(&["person 1", "person 2", "person 3"])),
                (ParamKey::Edges, strs(&["knows 1 2"])),
                (ParamKey::Directed, AttrValue::Bool(true)),
            ],
        );
        let def = graph_def_of(&instance.on_receive(&create).unwrap());
        let registered = instance.registry().has(&def.key);
        (registered, def)
    });

    let (has0, def0) = &results[0];
    let (has1, def1) = &results[1];
    assert!(*has0 && *has1);
    assert_eq!(def0, def1);
    assert!(def0.vineyard_id > 0);

    let client = store.client();
    assert!(client.exists(ObjectId::from_i64(def0.vineyard_id))?);
    Ok(())
}

#[test]
fn test_one_sided_load_failure_is_uniform() -> Result<(), Box<dyn Error>> {
    let store = Store::open("/tmp/engine-test.sock", "127.0.0.1:9600");

    // Worker 0 reads a valid schema file; worker 1's path is unreadable.
    let schema_path = std::env::temp_dir().join("engine-schema-test.json");
    let schema = graph::PropertyGraphSchema {
        vertex_labels: vec![graph::LabelSchema {
            label: "person".to_string(),
            properties: vec![],
        }],
        edge_labels: vec![],
    };
    std::fs::write(&schema_path, serde_json::to_string(&schema)?)?;
    let good_path = schema_path.to_string_lossy().to_string();

    let results = run_workers(&store, 2, |worker_id, mut instance| {
        let path = if worker_id == 0 {
            good_path.clone()
        } else {
            "/nonexistent/engine-schema.json".to_string()
        };
        let create = command(
            CommandKind::CreateGraph,
            vec![
                (
                    ParamKey::GraphType,
                    AttrValue::GraphType(GraphType::ArrowProperty),
                ),
                (
                    ParamKey::TypeSignature,
                    AttrValue::Str(engine::BUILTIN_PROPERTY_SIG.to_string()),
                ),
                (ParamKey::SchemaPath, AttrValue::Str(path)),
                (ParamKey::Nodes, strs(&["person 1"])),
                (ParamKey::Directed, AttrValue::Bool(true)),
            ],
        );
        let result = instance.on_receive(&create);
        // The command is not published anywhere on failure.
        (result.map(|_| ()), instance.registry().has("graph_0"))
    });

    for (result, has_graph) in &results {
        let err = result.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreError);
        assert!(!*has_graph);
    }

    std::fs::remove_file(&schema_path)?;
    Ok(())
}
