// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! MPI-style communicator for the graph engine's worker set.
//!
//! Every collective operation must be entered by all workers in the same
//! order with consistent arguments; the dispatcher's lock-step command
//! processing is what guarantees this. The [`Switchboard`] wires the worker
//! threads of one process together with a dedicated channel per ordered
//! worker pair, so that messages from distinct peers can never interleave
//! within one collective. A multi-process transport behind the same surface
//! is the deployment's concern, not this crate's.

use std::sync::{Arc, Barrier};

use crossbeam_channel::{Receiver, Sender};

use graph_types::{Error, ErrorKind};

/// Allocates the communicators for one symmetric worker set.
#[derive(Debug)]
pub struct Switchboard;

impl Switchboard {
    /// Creates `workers` paired communicators.
    ///
    /// The returned specs are handed to the worker threads in index order;
    /// worker ids and fragment ids coincide.
    pub fn allocate(workers: usize) -> Vec<CommSpec> {
        assert!(workers > 0);
        let barrier = Arc::new(Barrier::new(workers));
        // One channel per ordered (from, to) pair.
        let mut txs: Vec<Vec<Option<Sender<Vec<u8>>>>> = (0..workers)
            .map(|_| (0..workers).map(|_| None).collect())
            .collect();
        let mut rxs: Vec<Vec<Option<Receiver<Vec<u8>>>>> = (0..workers)
            .map(|_| (0..workers).map(|_| None).collect())
            .collect();
        for from in 0..workers {
            for to in 0..workers {
                let (tx, rx) = crossbeam_channel::unbounded();
                txs[from][to] = Some(tx);
                rxs[to][from] = Some(rx);
            }
        }
        txs.into_iter()
            .zip(rxs)
            .enumerate()
            .map(|(worker_id, (tx_row, rx_row))| CommSpec {
                worker_id,
                fnum: workers,
                barrier: Arc::clone(&barrier),
                txs: tx_row.into_iter().map(Option::unwrap).collect(),
                rxs: rx_row.into_iter().map(Option::unwrap).collect(),
            })
            .collect()
    }
}

/// One worker's communicator.
#[derive(Debug)]
pub struct CommSpec {
    worker_id: usize,
    fnum: usize,
    barrier: Arc<Barrier>,
    txs: Vec<Sender<Vec<u8>>>,
    rxs: Vec<Receiver<Vec<u8>>>,
}

impl CommSpec {
    /// The id of this worker.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// The fragment id held by this worker.
    pub fn fid(&self) -> usize {
        self.worker_id
    }

    /// The total number of fragments (== workers).
    pub fn fnum(&self) -> usize {
        self.fnum
    }

    /// Blocks until every worker has entered the barrier.
    pub fn barrier(&self) {
        self.barrier.wait();
    }

    fn send(&self, to: usize, bytes: Vec<u8>) -> Result<(), Error> {
        self.txs[to]
            .send(bytes)
            .map_err(|_| Error::new(ErrorKind::CommError, format!("worker {} hung up", to)))
    }

    fn recv(&self, from: usize) -> Result<Vec<u8>, Error> {
        self.rxs[from]
            .recv()
            .map_err(|_| Error::new(ErrorKind::CommError, format!("worker {} hung up", from)))
    }

    /// Gathers every worker's payload at worker 0, in worker order.
    ///
    /// Returns `Some` on worker 0 and `None` elsewhere.
    pub fn gather_to_root(&self, bytes: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, Error> {
        if self.worker_id == 0 {
            let mut out = Vec::with_capacity(self.fnum);
            out.push(bytes);
            for from in 1..self.fnum {
                out.push(self.recv(from)?);
            }
            Ok(Some(out))
        } else {
            self.send(0, bytes)?;
            Ok(None)
        }
    }

    /// Gathers every worker's payload on every worker, in worker order.
    pub fn all_gather(&self, bytes: Vec<u8>) -> Result<Vec<Vec<u8>>, Error> {
        for to in 0..self.fnum {
            if to != self.worker_id {
                self.send(to, bytes.clone())?;
            }
        }
        let mut out = Vec::with_capacity(self.fnum);
        for from in 0..self.fnum {
            if from == self.worker_id {
                out.push(bytes.clone());
            } else {
                out.push(self.recv(from)?);
            }
        }
        Ok(out)
    }

    /// Sums an `i64` at worker 0. Returns `Some(total)` there, `None`
    /// elsewhere.
    pub fn reduce_sum_i64(&self, v: i64) -> Result<Option<i64>, Error> {
        let gathered = self.gather_to_root(v.to_le_bytes().to_vec())?;
        Ok(gathered.map(|parts| parts.iter().map(|b| decode_i64(b)).sum()))
    }

    /// Sums an `i64` on every worker.
    pub fn all_reduce_sum_i64(&self, v: i64) -> Result<i64, Error> {
        let parts = self.all_gather(v.to_le_bytes().to_vec())?;
        Ok(parts.iter().map(|b| decode_i64(b)).sum())
    }

    /// Sums an `f64` on every worker.
    pub fn all_reduce_sum_f64(&self, v: f64) -> Result<f64, Error> {
        let parts = self.all_gather(v.to_le_bytes().to_vec())?;
        Ok(parts
            .iter()
            .map(|b| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&b[..8]);
                f64::from_le_bytes(buf)
            })
            .sum())
    }

    /// Logically ORs a flag across all workers.
    pub fn all_reduce_or(&self, v: bool) -> Result<bool, Error> {
        let parts = self.all_gather(vec![v as u8])?;
        Ok(parts.iter().any(|b| b[0] != 0))
    }

    /// Distributes worker 0's payload to every worker.
    pub fn broadcast_from_root(&self, bytes: Option<Vec<u8>>) -> Result<Vec<u8>, Error> {
        if self.worker_id == 0 {
            let bytes = bytes.ok_or_else(|| {
                Error::new(ErrorKind::CommError, "broadcast root has no payload".to_string())
            })?;
            for to in 1..self.fnum {
                self.send(to, bytes.clone())?;
            }
            Ok(bytes)
        } else {
            self.recv(0)
        }
    }

    /// Makes a command outcome uniform across the worker set.
    ///
    /// One worker's failure cannot be compensated by the others without
    /// leaving shared state inconsistent, and a worker that bails out of a
    /// collective wedges its peers. Every worker therefore contributes its
    /// local outcome, and if any worker failed, all workers report the first
    /// failing worker's error.
    pub fn uniform_result<T>(&self, local: Result<T, Error>) -> Result<T, Error> {
        let err = local.as_ref().err().cloned();
        let encoded = serde_json::to_vec(&err)
            .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))?;
        for part in self.all_gather(encoded)? {
            let remote: Option<Error> = serde_json::from_slice(&part)
                .map_err(|e| Error::new(ErrorKind::CommError, e.to_string()))?;
            if let Some(e) = remote {
                return Err(e);
            }
        }
        local
    }

    /// Sends `msgs[w]` to worker `w` and returns the payloads received from
    /// each worker, in worker order.
    pub fn exchange(&self, msgs: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, Error> {
        assert_eq!(msgs.len(), self.fnum);
        let mut own = None;
        for (to, bytes) in msgs.into_iter().enumerate() {
            if to == self.worker_id {
                own = Some(bytes);
            } else {
                self.send(to, bytes)?;
            }
        }
        let mut out = Vec::with_capacity(self.fnum);
        for from in 0..self.fnum {
            if from == self.worker_id {
                out.push(own.take().unwrap_or_default());
            } else {
                out.push(self.recv(from)?);
            }
        }
        Ok(out)
    }
}

fn decode_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    i64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn run_collective<F, T>(workers: usize, f: F) -> Vec<T>
    where
        F: Fn(CommSpec) -> T + Send + Sync,
        T: Send,
    {
        let specs = Switchboard::allocate(workers);
        thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = specs
                .into_iter()
                .map(|spec| s.spawn(move || f(spec)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_gather_to_root_orders_by_worker() {
        let results = run_collective(3, |spec| {
            let payload = vec![spec.worker_id() as u8];
            spec.gather_to_root(payload).unwrap()
        });
        assert_eq!(
            results[0],
            Some(vec![vec![0u8], vec![1u8], vec![2u8]])
        );
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
    }

    #[test]
    fn test_all_gather_is_symmetric() {
        let results = run_collective(3, |spec| {
            spec.all_gather(vec![spec.worker_id() as u8 * 10]).unwrap()
        });
        for r in results {
            assert_eq!(r, vec![vec![0u8], vec![10u8], vec![20u8]]);
        }
    }

    #[test]
    fn test_reduce_and_broadcast() {
        let results = run_collective(2, |spec| {
            let total = spec.reduce_sum_i64(spec.worker_id() as i64 + 1).unwrap();
            let seed = total.map(|t| t.to_le_bytes().to_vec());
            let bytes = spec.broadcast_from_root(seed).unwrap();
            decode_i64(&bytes)
        });
        assert_eq!(results, vec![3, 3]);
    }

    #[test]
    fn test_uniform_result_spreads_first_failure() {
        let results = run_collective(3, |spec| {
            let local = if spec.worker_id() == 1 {
                Err(Error::new(ErrorKind::StoreError, "shard unreadable"))
            } else {
                Ok(spec.worker_id())
            };
            spec.uniform_result(local)
        });
        for r in results {
            let err = r.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::StoreError);
            assert_eq!(err.message(), "shard unreadable");
        }
    }

    #[test]
    fn test_exchange_routes_pairwise() {
        let results = run_collective(2, |spec| {
            let me = spec.worker_id() as u8;
            let msgs = (0..2).map(|to| vec![me, to as u8]).collect();
            spec.exchange(msgs).unwrap()
        });
        assert_eq!(results[0], vec![vec![0, 0], vec![1, 0]]);
        assert_eq!(results[1], vec![vec![0, 1], vec![1, 1]]);
    }
}
