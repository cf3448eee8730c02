// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An interactive engine server.
//!
//! `serve` spawns one worker thread per fragment. Every command the
//! coordinator submits is broadcast to all workers; each worker runs its
//! dispatcher strictly in submission order and reports a tagged result. The
//! [`LocalClient`] collects one result per worker, fails the command if any
//! worker failed, and otherwise aggregates the payloads under the command's
//! policy.

use std::thread;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::info;

use comm::Switchboard;
use graph_types::{aggregate, Command, CommandResponse, DispatchResult, Error};
use ore::thread::{JoinHandleExt, JoinOnDropHandle};
use store::Store;

use crate::instance::Instance;

/// Configures an engine server.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of worker threads to spawn; each holds one fragment.
    pub workers: usize,
    /// The IPC socket of the shared object store.
    pub ipc_socket: String,
    /// The RPC endpoint of the shared object store.
    pub rpc_endpoint: String,
}

/// A handle to a running engine server.
///
/// Dropping this object blocks until every worker has exited; drop the
/// [`LocalClient`] first to hang up the command channels.
pub struct Server {
    _worker_guards: Vec<JoinOnDropHandle<()>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("workers", &self._worker_guards.len())
            .finish()
    }
}

type WorkerResponse = (usize, Result<DispatchResult, Error>);

/// Initiates an engine computation, processing commands from a local
/// coordinator.
pub fn serve(config: Config) -> Result<(Server, LocalClient), anyhow::Error> {
    if config.workers == 0 {
        return Err(anyhow!("engine requires at least one worker"));
    }
    let store = Store::open(&config.ipc_socket, &config.rpc_endpoint);
    let specs = Switchboard::allocate(config.workers);

    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let mut command_txs = Vec::with_capacity(config.workers);
    let mut guards = Vec::with_capacity(config.workers);
    for (worker_id, spec) in specs.into_iter().enumerate() {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        command_txs.push(command_tx);
        let client = store.client();
        let response_tx = response_tx.clone();
        let guard = thread::Builder::new()
            .name(format!("engine-worker-{}", worker_id))
            .spawn(move || {
                Worker {
                    worker_id,
                    instance: Instance::new(spec, client),
                    command_rx,
                    response_tx,
                }
                .run()
            })
            .map_err(|e| anyhow!("failed to spawn worker {}: {}", worker_id, e))?
            .join_on_drop();
        guards.push(guard);
    }
    info!(workers = config.workers, "engine workers initialized");

    Ok((
        Server {
            _worker_guards: guards,
        },
        LocalClient {
            command_txs,
            response_rx,
            workers: config.workers,
        },
    ))
}

/// State maintained by one worker thread.
struct Worker {
    worker_id: usize,
    instance: Instance,
    command_rx: crossbeam_channel::Receiver<Command>,
    response_tx: mpsc::UnboundedSender<WorkerResponse>,
}

impl Worker {
    /// Draws commands until the coordinator hangs up.
    fn run(mut self) {
        while let Ok(cmd) = self.command_rx.recv() {
            let result = self.instance.on_receive(&cmd);
            if self.response_tx.send((self.worker_id, result)).is_err() {
                break;
            }
        }
    }
}

/// A coordinator-side client to an in-process worker set.
#[derive(Debug)]
pub struct LocalClient {
    command_txs: Vec<crossbeam_channel::Sender<Command>>,
    response_rx: mpsc::UnboundedReceiver<WorkerResponse>,
    workers: usize,
}

impl LocalClient {
    /// Broadcasts a command to every worker and aggregates their results.
    ///
    /// Partial success is never reported as success: if any worker failed,
    /// the first failure in worker order becomes the command's outcome.
    pub async fn execute(&mut self, cmd: Command) -> Result<CommandResponse, Error> {
        for tx in &self.command_txs {
            tx.send(cmd.clone()).map_err(|_| {
                Error::new(
                    graph_types::ErrorKind::CommError,
                    "a worker hung up".to_string(),
                )
            })?;
        }
        let mut results: Vec<Option<Result<DispatchResult, Error>>> =
            (0..self.workers).map(|_| None).collect();
        for _ in 0..self.workers {
            let (worker_id, result) = self.response_rx.recv().await.ok_or_else(|| {
                Error::new(
                    graph_types::ErrorKind::CommError,
                    "a worker hung up".to_string(),
                )
            })?;
            results[worker_id] = Some(result);
        }
        let mut ordered = Vec::with_capacity(self.workers);
        for result in results {
            match result.expect("every worker responded") {
                Ok(r) => ordered.push(r),
                Err(e) => return Err(e),
            }
        }
        aggregate(ordered)
    }
}
