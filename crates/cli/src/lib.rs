// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Policy gateway composition root: argument parsing, store bootstrap,
//! watcher + server wiring, graceful shutdown.

pub mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use config::Config;
use gateway_storage::{CredentialStore, PipelineRunStore, TunnelRegistry, UsageCounters};
use gateway_watch::{watch_credentials, watch_tunnels, WatchHandle};
use tracing::{error, info};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gateway", version, about = "Policy-enforcement gateway for autonomous agent operations")]
pub struct Args {
    /// Address to listen on, e.g. 0.0.0.0:8080.
    #[arg(long)]
    pub bind: Option<String>,

    /// Root state directory holding the credential/tunnel/pipeline-run/usage
    /// files. Defaults to an XDG-style per-user state directory.
    #[arg(long = "state-dir", value_name = "PATH")]
    pub state_dir: Option<PathBuf>,
}

/// Everything spun up at startup, kept alive for the life of the process.
/// Dropping `_tunnel_watch`/`_credential_watch` stops the config watcher.
pub struct Running {
    pub local_addr: std::net::SocketAddr,
    pub usage: Arc<UsageCounters>,
    _tunnel_watch: WatchHandle,
    _credential_watch: WatchHandle,
}

impl Running {
    /// Flush usage counters to disk synchronously on graceful shutdown.
    pub fn flush_usage(&self) {
        if let Err(e) = self.usage.persist() {
            error!(error = %e, "failed to flush usage counters on shutdown");
        }
    }
}

/// Resolve configuration, open the stores, start the watchers, and bind the
/// HTTP listener. Returns once bound; the caller drives the accept loop with
/// [`serve`].
pub async fn bootstrap(args: Args) -> anyhow::Result<(Running, tokio::net::TcpListener, axum::Router)> {
    let config = Config::load(args.bind, args.state_dir)?;
    std::fs::create_dir_all(&config.state_dir)?;

    info!(state_dir = %config.state_dir.display(), bind = %config.bind, "starting policy gateway");

    let credentials = Arc::new(open_or_exit("credential store", || CredentialStore::load(&config.credentials_path)));
    let tunnels = Arc::new(open_or_exit("tunnel registry", || TunnelRegistry::load(&config.tunnels_path)));
    let runs = Arc::new(open_or_exit("pipeline run store", || PipelineRunStore::load(&config.runs_path)));
    let usage = Arc::new(open_or_exit("usage counters", || UsageCounters::load(&config.usage_path)));

    // The pipeline run store is process-owned and explicitly not watched:
    // it's loaded once above and never re-read from disk.
    let tunnel_watch = watch_tunnels(&config.tunnels_path, tunnels.clone())
        .map_err(|e| anyhow::anyhow!("failed to watch tunnel file: {e}"))?;
    let credential_watch = watch_credentials(&config.credentials_path, credentials.clone())
        .map_err(|e| anyhow::anyhow!("failed to watch credential file: {e}"))?;

    let state = gateway_server::state::AppState::new(credentials, tunnels, runs, usage.clone());
    let router = gateway_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "listening");

    let running = Running {
        local_addr,
        usage,
        _tunnel_watch: tunnel_watch,
        _credential_watch: credential_watch,
    };
    Ok((running, listener, router))
}

/// Serve `router` on `listener` until `shutdown` resolves, then return so the
/// caller can flush state.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Open a store or terminate the process with a logged cause and non-zero
/// exit: unreadable or corrupt store files at startup are fatal.
fn open_or_exit<T, E: std::fmt::Display>(label: &str, load: impl FnOnce() -> Result<T, E>) -> T {
    match load() {
        Ok(value) => value,
        Err(e) => {
            error!(store = label, error = %e, "failed to load store at startup");
            eprintln!("error: failed to load {label}: {e}");
            std::process::exit(1);
        }
    }
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
