// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Single-source shortest paths.

use comm::CommSpec;
use graph::FragmentHandle;
use graph_types::{Error, ErrorKind, QueryArgs};

use crate::app::{AppModule, AppOutput, AppWorker, EngineSpec};
use crate::apps::{arg, decode_pairs, encode_pairs, AlgoView};
use crate::context::ContextData;

/// The built-in sssp module.
pub static MODULE: AppModule = AppModule {
    name: "sssp",
    create_worker,
};

fn create_worker(
    frag: &FragmentHandle,
    _spec: &EngineSpec,
) -> Result<Box<dyn AppWorker>, Error> {
    Ok(Box::new(SsspWorker {
        frag: frag.clone(),
        view: AlgoView::build(frag)?,
    }))
}

struct SsspWorker {
    frag: FragmentHandle,
    view: AlgoView,
}

impl AppWorker for SsspWorker {
    fn query(&mut self, comm: &CommSpec, args: &QueryArgs) -> Result<AppOutput, Error> {
        let source = arg(args, "src").ok_or_else(|| {
            Error::new(ErrorKind::InvalidValue, "sssp needs a src argument")
        })?;
        let source_gid = self.view.resolve_source(&self.frag, source)?;

        let view = &self.view;
        let mut dist = vec![f64::INFINITY; view.vertices.len()];
        let mut active: Vec<usize> = Vec::new();
        if let Some(gid) = source_gid {
            if let Some(&i) = view.index.get(&gid) {
                dist[i] = 0.0;
                active.push(i);
            }
        }

        loop {
            let mut buckets: Vec<Vec<(u64, f64)>> = vec![Vec::new(); view.fnum];
            for &u in &active {
                for &(v, w) in &view.edges[u] {
                    buckets[view.owner_of(v)].push((v, dist[u] + w));
                }
            }
            let parts = comm.exchange(buckets.iter().map(|b| encode_pairs(b)).collect())?;
            active.clear();
            for part in parts {
                for (gid, cand) in decode_pairs(&part) {
                    if let Some(&i) = view.index.get(&gid) {
                        if cand < dist[i] {
                            dist[i] = cand;
                            if !active.contains(&i) {
                                active.push(i);
                            }
                        }
                    }
                }
            }
            if !comm.all_reduce_or(!active.is_empty())? {
                break;
            }
        }
        Ok(AppOutput::VertexData(ContextData::F64(dist)))
    }
}
