// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Config Watcher: re-reads the tunnel and credential files on
//! out-of-band modification and atomically swaps the in-memory snapshot.
//! Parse failure logs a warning and retains the prior snapshot; in-flight
//! requests keep seeing whatever they started with.
//!
//! The pipeline run store is process-owned and intentionally not watched
//! here: it's written only by this process and read once at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gateway_storage::{CredentialStore, TunnelRegistry};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Debounce window: multiple filesystem events from one save (truncate +
/// write + rename on some editors) collapse into a single reload.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Keeps the underlying `notify` watcher and its reload task alive. Drop to
/// stop watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

fn spawn_watcher(path: PathBuf, reload: impl Fn() + Send + 'static) -> Result<WatchHandle, notify::Error> {
    let (tx, mut rx) = mpsc::channel::<()>(16);

    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Drain any events that arrive during the debounce window so a
            // burst of writes triggers exactly one reload.
            while tokio::time::timeout(DEBOUNCE, rx.recv()).await.is_ok() {}
            debug!(path = %path.display(), "config file changed, reloading");
            reload();
        }
    });

    Ok(WatchHandle { _watcher: watcher })
}

/// Start watching the tunnel file; reloads `registry` in place on change.
pub fn watch_tunnels(path: impl AsRef<Path>, registry: Arc<TunnelRegistry>) -> Result<WatchHandle, notify::Error> {
    let path = path.as_ref().to_path_buf();
    spawn_watcher(path.clone(), move || {
        if let Err(e) = registry.reload_from_disk() {
            warn!(path = %path.display(), error = %e, "failed to reload tunnel file, keeping prior snapshot");
        }
    })
}

/// Start watching the credential file; reloads `store` in place on change.
pub fn watch_credentials(path: impl AsRef<Path>, store: Arc<CredentialStore>) -> Result<WatchHandle, notify::Error> {
    let path = path.as_ref().to_path_buf();
    spawn_watcher(path.clone(), move || {
        if let Err(e) = store.reload_from_disk() {
            warn!(path = %path.display(), error = %e, "failed to reload credential file, keeping prior snapshot");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn tunnel_file_edit_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunnels.json");
        fs::write(&path, "{}").unwrap();

        let registry = Arc::new(TunnelRegistry::load(&path).unwrap());
        let _handle = watch_tunnels(&path, registry.clone()).unwrap();

        registry
            .create(gateway_storage::NewTunnel {
                name: "DevOps".into(),
                allowed_methods: vec!["POST".into()],
                allowed_paths: vec![],
                allowed_commands: vec![],
                forbidden_keywords: vec![],
                command_whitelist_mode: gateway_core::CommandWhitelistMode::Strict,
                description: String::new(),
                pipeline: None,
            })
            .unwrap();

        // The write above went through the registry itself, not an external
        // edit, so just confirm the watcher doesn't choke on its own writes.
        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert!(registry.get("DevOps").is_some());
    }

    #[tokio::test]
    async fn malformed_rewrite_keeps_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunnels.json");
        fs::write(&path, "{}").unwrap();

        let registry = Arc::new(TunnelRegistry::load(&path).unwrap());
        registry
            .create(gateway_storage::NewTunnel {
                name: "DevOps".into(),
                allowed_methods: vec!["POST".into()],
                allowed_paths: vec![],
                allowed_commands: vec![],
                forbidden_keywords: vec![],
                command_whitelist_mode: gateway_core::CommandWhitelistMode::Strict,
                description: String::new(),
                pipeline: None,
            })
            .unwrap();
        let _handle = watch_tunnels(&path, registry.clone()).unwrap();

        fs::write(&path, "not json at all").unwrap();
        tokio::time::sleep(StdDuration::from_millis(400)).await;

        assert!(registry.get("DevOps").is_some());
    }
}
