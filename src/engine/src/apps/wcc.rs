// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Weakly connected components by minimum-gid label propagation.

use comm::CommSpec;
use graph::FragmentHandle;
use graph_types::{Error, QueryArgs};

use crate::app::{AppModule, AppOutput, AppWorker, EngineSpec};
use crate::apps::{decode_id_pairs, encode_id_pairs, AlgoView};
use crate::context::ContextData;

/// The built-in wcc module.
pub static MODULE: AppModule = AppModule {
    name: "wcc",
    create_worker,
};

fn create_worker(
    frag: &FragmentHandle,
    _spec: &EngineSpec,
) -> Result<Box<dyn AppWorker>, Error> {
    Ok(Box::new(WccWorker {
        view: AlgoView::build(frag)?,
    }))
}

struct WccWorker {
    view: AlgoView,
}

impl AppWorker for WccWorker {
    fn query(&mut self, comm: &CommSpec, _args: &QueryArgs) -> Result<AppOutput, Error> {
        let view = &self.view;

        // Weak connectivity ignores direction; mirror every arc once so each
        // endpoint sees the other.
        let mut undirected: Vec<Vec<u64>> = view
            .edges
            .iter()
            .map(|out| out.iter().map(|&(v, _)| v).collect())
            .collect();
        let mut buckets: Vec<Vec<(u64, u64)>> = vec![Vec::new(); view.fnum];
        for (u, out) in view.edges.iter().enumerate() {
            let u_gid = view.vertices[u];
            for &(v, _) in out {
                buckets[view.owner_of(v)].push((v, u_gid));
            }
        }
        let parts = comm.exchange(buckets.iter().map(|b| encode_id_pairs(b)).collect())?;
        for part in parts {
            for (v_gid, u_gid) in decode_id_pairs(&part) {
                if let Some(&i) = view.index.get(&v_gid) {
                    undirected[i].push(u_gid);
                }
            }
        }

        let mut comp: Vec<u64> = view.vertices.clone();
        loop {
            let mut buckets: Vec<Vec<(u64, u64)>> = vec![Vec::new(); view.fnum];
            for (u, neighbors) in undirected.iter().enumerate() {
                for &v in neighbors {
                    buckets[view.owner_of(v)].push((v, comp[u]));
                }
            }
            let parts = comm.exchange(buckets.iter().map(|b| encode_id_pairs(b)).collect())?;
            let mut changed = false;
            for part in parts {
                for (gid, label) in decode_id_pairs(&part) {
                    if let Some(&i) = view.index.get(&gid) {
                        if label < comp[i] {
                            comp[i] = label;
                            changed = true;
                        }
                    }
                }
            }
            if !comm.all_reduce_or(changed)? {
                break;
            }
        }
        Ok(AppOutput::VertexData(ContextData::I64(
            comp.into_iter().map(|c| c as i64).collect(),
        )))
    }
}
