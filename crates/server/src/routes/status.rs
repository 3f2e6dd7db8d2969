// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! `GET /status`: unauthenticated health check plus aggregate counts.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use gateway_core::{PipelineStatus, Tier};
use serde_json::json;

use crate::state::AppState;

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tunnels: Vec<String> = state.tunnels.list().into_iter().map(|t| t.name).collect();
    let worker_count = state
        .credentials
        .list()
        .into_iter()
        .filter(|(_, c)| c.tier == Tier::Worker)
        .count();
    let runs = state.runs.list();
    let completed = runs.iter().filter(|r| r.status == PipelineStatus::Completed).count();

    Json(json!({
        "status": "ok",
        "mode": "running",
        "uptime_seconds": (Utc::now() - state.started_at).num_seconds().max(0),
        "tunnels": tunnels,
        "workers": worker_count,
        "pipelines": {
            "total": runs.len(),
            "completed": completed,
        },
    }))
}
