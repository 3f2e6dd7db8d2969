// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `gateway` — policy gateway composition root binary. Thin wrapper around
//! `gateway_cli::bootstrap`/`serve`; the actual wiring lives in the library
//! so it can be exercised from integration tests.

use clap::Parser;
use gateway_cli::{bootstrap, init_tracing, serve, Args};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let (running, listener, router) = bootstrap(args).await?;
    serve(listener, router, shutdown_signal()).await?;

    info!("shutting down, flushing usage counters");
    running.flush_usage();
    info!("gateway stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, whichever comes first, then stop accepting
/// new connections ("graceful shutdown").
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}
