// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Per-worker results and their coordinator-side aggregation.

use serde::{Deserialize, Serialize};

use crate::def::GraphDef;
use crate::error::{Error, ErrorKind};

/// How the coordinator combines per-worker payloads into one response.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AggregatePolicy {
    /// Keep only worker 0's payload.
    PickFirst,
    /// Keep the first non-empty payload in worker order.
    PickFirstNonEmpty,
    /// Concatenate per-worker payloads in worker order.
    Concat,
}

/// The payload of one worker's dispatch result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResultPayload {
    /// No payload.
    None,
    /// Graph metadata; identical on every worker.
    GraphDef(GraphDef),
    /// Raw bytes: a string, a JSON document, or a serialized archive.
    Data(Vec<u8>),
}

/// One worker's result for one command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// The id of the worker that produced this result.
    pub worker_id: usize,
    /// The worker's payload.
    pub payload: ResultPayload,
    /// The coordinator's aggregation policy for this payload.
    pub policy: AggregatePolicy,
}

impl DispatchResult {
    /// Creates an empty result for the given worker.
    pub fn new(worker_id: usize) -> DispatchResult {
        DispatchResult {
            worker_id,
            payload: ResultPayload::None,
            policy: AggregatePolicy::PickFirst,
        }
    }

    /// Attaches graph metadata.
    pub fn set_graph_def(&mut self, graph_def: GraphDef) {
        self.payload = ResultPayload::GraphDef(graph_def);
    }

    /// Attaches a byte payload with the default `PickFirst` policy.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.set_data_with_policy(data, AggregatePolicy::PickFirst);
    }

    /// Attaches a byte payload with an explicit aggregation policy.
    pub fn set_data_with_policy(&mut self, data: Vec<u8>, policy: AggregatePolicy) {
        self.payload = ResultPayload::Data(data);
        self.policy = policy;
    }
}

/// The coordinator-visible outcome of a command.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Graph metadata, for commands that produce a graph.
    pub graph_def: Option<GraphDef>,
    /// Aggregated byte payload, for commands that produce data.
    pub data: Vec<u8>,
}

impl CommandResponse {
    /// Interprets the payload as UTF-8.
    pub fn data_utf8(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.data)
            .map_err(|e| Error::new(ErrorKind::InvalidValue, e.to_string()))
    }
}

/// Combines per-worker results into one response.
///
/// Results must be presented in worker order, one per worker. Partial success
/// is never reported as success: callers surface any worker error before this
/// function runs. Graph defs are required to agree across workers.
pub fn aggregate(results: Vec<DispatchResult>) -> Result<CommandResponse, Error> {
    let mut response = CommandResponse::default();
    let mut policy = AggregatePolicy::PickFirst;
    for result in &results {
        match &result.payload {
            ResultPayload::None => (),
            ResultPayload::GraphDef(def) => match &response.graph_def {
                None => response.graph_def = Some(def.clone()),
                Some(prev) if prev == def => (),
                Some(prev) => {
                    return Err(Error::new(
                        ErrorKind::IllegalState,
                        format!(
                            "graph defs diverge across workers: {:?} vs {:?}",
                            prev.key, def.key
                        ),
                    ));
                }
            },
            ResultPayload::Data(_) => policy = result.policy,
        }
    }
    match policy {
        AggregatePolicy::PickFirst => {
            if let Some(DispatchResult {
                payload: ResultPayload::Data(data),
                ..
            }) = results.first()
            {
                response.data = data.clone();
            }
        }
        AggregatePolicy::PickFirstNonEmpty => {
            for result in &results {
                if let ResultPayload::Data(data) = &result.payload {
                    if !data.is_empty() {
                        response.data = data.clone();
                        break;
                    }
                }
            }
        }
        AggregatePolicy::Concat => {
            for result in &results {
                if let ResultPayload::Data(data) = &result.payload {
                    response.data.extend_from_slice(data);
                }
            }
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_result(worker_id: usize, data: &str, policy: AggregatePolicy) -> DispatchResult {
        let mut r = DispatchResult::new(worker_id);
        r.set_data_with_policy(data.as_bytes().to_vec(), policy);
        r
    }

    #[test]
    fn test_aggregate_pick_first() {
        let results = vec![
            data_result(0, "zero", AggregatePolicy::PickFirst),
            data_result(1, "one", AggregatePolicy::PickFirst),
        ];
        let response = aggregate(results).unwrap();
        assert_eq!(response.data_utf8().unwrap(), "zero");
    }

    #[test]
    fn test_aggregate_pick_first_non_empty() {
        let results = vec![
            data_result(0, "", AggregatePolicy::PickFirstNonEmpty),
            data_result(1, "one", AggregatePolicy::PickFirstNonEmpty),
        ];
        let response = aggregate(results).unwrap();
        assert_eq!(response.data_utf8().unwrap(), "one");
    }

    #[test]
    fn test_aggregate_concat() {
        let results = vec![
            data_result(0, "a", AggregatePolicy::Concat),
            data_result(1, "b", AggregatePolicy::Concat),
        ];
        let response = aggregate(results).unwrap();
        assert_eq!(response.data_utf8().unwrap(), "ab");
    }
}
