// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! PageRank with uniform teleport and dangling redistribution.

use comm::CommSpec;
use graph::FragmentHandle;
use graph_types::{Error, QueryArgs};

use crate::app::{AppModule, AppOutput, AppWorker, EngineSpec};
use crate::apps::{arg, decode_pairs, encode_pairs, AlgoView};
use crate::context::ContextData;

/// The built-in pagerank module.
pub static MODULE: AppModule = AppModule {
    name: "pagerank",
    create_worker,
};

fn create_worker(
    frag: &FragmentHandle,
    _spec: &EngineSpec,
) -> Result<Box<dyn AppWorker>, Error> {
    Ok(Box::new(PageRankWorker {
        view: AlgoView::build(frag)?,
    }))
}

struct PageRankWorker {
    view: AlgoView,
}

impl AppWorker for PageRankWorker {
    fn query(&mut self, comm: &CommSpec, args: &QueryArgs) -> Result<AppOutput, Error> {
        let alpha = arg(args, "delta").and_then(|v| v.as_f64()).unwrap_or(0.85);
        let max_round = arg(args, "max_round")
            .and_then(|v| v.as_i64())
            .unwrap_or(10);

        let view = &self.view;
        let n_local = view.vertices.len();
        let n = comm.all_reduce_sum_i64(n_local as i64)? as f64;
        if n == 0.0 {
            return Ok(AppOutput::VertexData(ContextData::F64(Vec::new())));
        }

        let degree: Vec<usize> = view.edges.iter().map(|e| e.len()).collect();
        let mut rank = vec![1.0 / n; n_local];
        for _ in 0..max_round {
            let dangling_local: f64 = rank
                .iter()
                .zip(&degree)
                .filter(|(_, d)| **d == 0)
                .map(|(r, _)| *r)
                .sum();
            let dangling = comm.all_reduce_sum_f64(dangling_local)?;

            let mut buckets: Vec<Vec<(u64, f64)>> = vec![Vec::new(); view.fnum];
            for (u, out) in view.edges.iter().enumerate() {
                if !out.is_empty() {
                    let share = rank[u] / out.len() as f64;
                    for &(v, _) in out {
                        buckets[view.owner_of(v)].push((v, share));
                    }
                }
            }
            let parts = comm.exchange(buckets.iter().map(|b| encode_pairs(b)).collect())?;
            let mut incoming = vec![0.0; n_local];
            for part in parts {
                for (gid, share) in decode_pairs(&part) {
                    if let Some(&i) = view.index.get(&gid) {
                        incoming[i] += share;
                    }
                }
            }
            for i in 0..n_local {
                rank[i] = (1.0 - alpha) / n + alpha * (incoming[i] + dangling / n);
            }
        }
        Ok(AppOutput::VertexData(ContextData::F64(rank)))
    }
}
