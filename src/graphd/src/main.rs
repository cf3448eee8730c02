// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Standalone analytical-engine worker server.

use std::process;

use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Independent analytical-engine server.
#[derive(StructOpt)]
struct Args {
    /// Number of engine worker threads.
    #[structopt(
        short,
        long,
        env = "GRAPHD_WORKERS",
        value_name = "W",
        default_value = "1"
    )]
    workers: usize,
    /// IPC socket of the shared object store.
    #[structopt(
        long,
        env = "GRAPHD_VINEYARD_SOCKET",
        value_name = "PATH",
        default_value = "/tmp/vineyard.sock"
    )]
    vineyard_socket: String,
    /// RPC endpoint of the shared object store.
    #[structopt(
        long,
        env = "GRAPHD_VINEYARD_RPC_ENDPOINT",
        value_name = "HOST:PORT",
        default_value = "127.0.0.1:9600"
    )]
    vineyard_rpc_endpoint: String,
    /// Logging filter.
    #[structopt(long, env = "GRAPHD_LOG_FILTER", default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Args::from_args()).await {
        eprintln!("graphd: {:#}", err);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_filter))
        .init();

    let config = engine::Config {
        workers: args.workers,
        ipc_socket: args.vineyard_socket.clone(),
        rpc_endpoint: args.vineyard_rpc_endpoint.clone(),
    };
    let (server, client) = engine::serve(config)?;
    info!(
        workers = args.workers,
        socket = %args.vineyard_socket,
        "graphd listening for coordinator commands"
    );

    // The command transport is attached by the deployment; keep the worker
    // set alive until the process is asked to stop.
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    drop(client);
    drop(server);
    Ok(())
}
