// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

#![allow(clippy::unwrap_used, clippy::panic)]

//! End-to-end smoke test: bootstrap the real composition root against a
//! temporary state directory, bound to an OS-assigned port, and drive it
//! with a real HTTP client.

use std::time::Duration;

use gateway_cli::{bootstrap, serve, Args};

#[tokio::test]
async fn status_is_reachable_with_no_auth_on_a_fresh_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let args = Args { bind: Some("127.0.0.1:0".to_string()), state_dir: Some(dir.path().to_path_buf()) };

    let (running, listener, router) = bootstrap(args).await.unwrap();
    let addr = running.local_addr;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        serve(listener, router, async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    let client = reqwest::Client::new();
    let resp = client.get(format!("http://{addr}/status")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let _ = shutdown_tx.send(());
    tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap();

    // The usage counter file should not exist yet (no authenticated
    // requests were made), but the directory itself must exist.
    assert!(dir.path().exists());
}

#[tokio::test]
async fn validate_without_api_key_is_denied() {
    let dir = tempfile::tempdir().unwrap();
    let args = Args { bind: Some("127.0.0.1:0".to_string()), state_dir: Some(dir.path().to_path_buf()) };

    let (running, listener, router) = bootstrap(args).await.unwrap();
    let addr = running.local_addr;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        serve(listener, router, async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/validate"))
        .json(&serde_json::json!({"command": "ls"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let _ = shutdown_tx.send(());
    tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap();
}
